//! Response renderer.
//!
//! Every word the caller hears is written here. The state machine decides *which* document to
//! send; this module decides what it says, in which language, and in what order. Each `Say` is
//! tagged with the speech-synthesis language of its text.

use crate::clinical::{PatientProfile, PrescriptionRecord};
use crate::constants::{
    ABHA_ENTRY_DIGITS, ABHA_ENTRY_PATH, BRAND_NAME, BRAND_NAME_IPA, LANGUAGE_SELECTION_PATH,
};
use crate::language::Language;
use aarogyam_types::AbhaId;
use twiml::{Gather, Method, Say, VoiceResponse};

/// Separator between medications in a spoken prescription.
pub const MEDICATION_SEPARATOR: &str = ". ";

/// Builds localized voice documents.
///
/// This is a zero-sized type used for namespacing rendering operations.
pub struct Renderer;

impl Renderer {
    /// Welcome menu: English prompt then Hindi prompt, one key press expected.
    pub fn language_menu() -> VoiceResponse {
        VoiceResponse::new().gather(
            Gather::new()
                .num_digits(1)
                .action(LANGUAGE_SELECTION_PATH)
                .method(Method::Post)
                .say(branded(Language::English, "Welcome to ", ". For English, press 1."))
                .say(say(
                    Language::Hindi,
                    "आरोग्यम में आपका स्वागत है। हिंदी के लिए, 2 दबाएं।",
                )),
        )
    }

    /// Welcome prompt asking the caller to type their ABHA number.
    pub fn abha_entry_prompt() -> VoiceResponse {
        VoiceResponse::new().gather(
            Gather::new()
                .num_digits(ABHA_ENTRY_DIGITS)
                .action(ABHA_ENTRY_PATH)
                .method(Method::Post)
                .say(branded(
                    Language::English,
                    "Welcome to ",
                    ". Please enter your 14 digit ABHA ID followed by the hash key.",
                )),
        )
    }

    /// Confirms who is calling, then offers the main menu.
    pub fn identity_and_menu(
        language: Language,
        patient: &PatientProfile,
        action: &str,
    ) -> VoiceResponse {
        let identity = match language {
            Language::English => format!(
                "{}, ABHA ID {}.",
                patient.name.get(language),
                patient.abha_id
            ),
            Language::Hindi => format!(
                "{}, आभा आईडी {}।",
                patient.name.get(language),
                patient.abha_id
            ),
        };
        menu(language, say(language, identity), action)
    }

    /// Echoes a typed ABHA number, then offers the main menu in English.
    pub fn abha_received_and_menu(abha_id: &AbhaId, action: &str) -> VoiceResponse {
        let echo = say(
            Language::English,
            format!("Thank you. You have entered {abha_id}."),
        );
        menu(Language::English, echo, action)
    }

    /// Tells the caller their key press was not understood and sends the call to `url`.
    pub fn invalid_then_redirect(language: Language, url: &str) -> VoiceResponse {
        VoiceResponse::new()
            .say(invalid_selection(language))
            .redirect(url)
    }

    /// Reads the latest prescription, then says goodbye.
    pub fn prescription_then_close(
        language: Language,
        latest: Option<&PrescriptionRecord>,
    ) -> VoiceResponse {
        let line = match latest {
            Some(record) => prescription_sentence(language, record),
            None => match language {
                Language::English => "You have no prescriptions on record.".to_owned(),
                Language::Hindi => "आपके रिकॉर्ड में कोई प्रिस्क्रिप्शन नहीं है।".to_owned(),
            },
        };
        close(language, say(language, line))
    }

    /// Reads the emergency information, then says goodbye.
    pub fn emergency_then_close(language: Language, info: &str) -> VoiceResponse {
        let line = match language {
            Language::English => format!("Your emergency medical information is: {info}"),
            Language::Hindi => format!("आपकी आपातकालीन चिकित्सा जानकारी है: {info}"),
        };
        close(language, say(language, line))
    }

    /// Tells the caller their key press was not understood, then says goodbye.
    pub fn invalid_then_close(language: Language) -> VoiceResponse {
        close(language, invalid_selection(language))
    }
}

/// Medications of a prescription, each as "name, dosage, frequency for duration", in stored
/// order.
pub fn medication_summary(record: &PrescriptionRecord) -> String {
    record
        .medications
        .iter()
        .map(|med| {
            format!(
                "{}, {}, {} for {}",
                med.name, med.dosage, med.frequency, med.duration
            )
        })
        .collect::<Vec<_>>()
        .join(MEDICATION_SEPARATOR)
}

/// The full spoken sentence for a prescription.
pub fn prescription_sentence(language: Language, record: &PrescriptionRecord) -> String {
    let medications = medication_summary(record);
    match language {
        Language::English => format!(
            "Your latest prescription from {} on {} is: {medications}.",
            record.doctor, record.date
        ),
        Language::Hindi => format!(
            "डॉक्टर {} द्वारा {} को दी गई आपकी नवीनतम प्रिस्क्रिप्शन है: {medications}।",
            record.doctor, record.date
        ),
    }
}

fn say(language: Language, text: impl Into<String>) -> Say {
    Say::new(text).language(language.tts_tag())
}

/// A line containing the service name with its pronunciation hint.
fn branded(language: Language, before: &str, after: &str) -> Say {
    Say::default()
        .language(language.tts_tag())
        .text(before)
        .phoneme("ipa", BRAND_NAME_IPA, BRAND_NAME)
        .text(after)
}

fn menu(language: Language, lead: Say, action: &str) -> VoiceResponse {
    let prompt = match language {
        Language::English => "Press 1 to listen to your latest prescription. Press 2 to listen to your emergency medical information.",
        Language::Hindi => "अपनी नवीनतम प्रिस्क्रिप्शन सुनने के लिए 1 दबाएं। अपनी आपातकालीन चिकित्सा जानकारी सुनने के लिए 2 दबाएं।",
    };
    VoiceResponse::new().gather(
        Gather::new()
            .num_digits(1)
            .action(action)
            .method(Method::Post)
            .say(lead)
            .say(say(language, prompt)),
    )
}

fn invalid_selection(language: Language) -> Say {
    match language {
        Language::English => say(language, "Invalid selection."),
        Language::Hindi => say(language, "अमान्य चयन।"),
    }
}

fn close(language: Language, body: Say) -> VoiceResponse {
    let goodbye = match language {
        Language::English => branded(language, "Thank you for using ", ". Goodbye."),
        Language::Hindi => say(language, "आरोग्यम का उपयोग करने के लिए धन्यवाद। अलविदा।"),
    };
    VoiceResponse::new().say(body).say(goodbye).hangup()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::{ClinicalSource, MockClinicalData};
    use twiml::Twiml;

    fn latest() -> PrescriptionRecord {
        MockClinicalData::seed()
            .unwrap()
            .latest_prescription(&AbhaId::new("x").unwrap())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn medication_summary_joins_in_stored_order() {
        assert_eq!(
            medication_summary(&latest()),
            "Paracetamol 500mg, 1 tablet, Twice daily for 5 days. Cetirizine 10mg, 1 tablet, Once daily for 7 days"
        );
    }

    #[test]
    fn english_prescription_sentence() {
        assert_eq!(
            prescription_sentence(Language::English, &latest()),
            "Your latest prescription from Dr. Priya Sharma on 2024-09-16 is: Paracetamol 500mg, 1 tablet, Twice daily for 5 days. Cetirizine 10mg, 1 tablet, Once daily for 7 days."
        );
    }

    #[test]
    fn hindi_prescription_sentence() {
        let line = prescription_sentence(Language::Hindi, &latest());
        assert!(line.starts_with("डॉक्टर Dr. Priya Sharma द्वारा 2024-09-16 को"));
        assert!(line.ends_with("Once daily for 7 days।"));
    }

    #[test]
    fn language_menu_speaks_english_then_hindi() {
        let doc = Renderer::language_menu();
        let spoken = doc.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[0].language.as_deref(), Some("en-IN"));
        assert_eq!(spoken[1].language.as_deref(), Some("hi-IN"));
        assert_eq!(
            spoken[0].plain_text(),
            "Welcome to Aarogyam. For English, press 1."
        );
        let gather = doc.find_gather().unwrap();
        assert_eq!(gather.num_digits, Some(1));
        assert_eq!(gather.action.as_deref(), Some("/ivr/handle-language-selection"));
    }

    #[test]
    fn every_document_renders() {
        let patient = MockClinicalData::seed().unwrap().caller().unwrap();
        let record = latest();
        let mut docs = vec![Renderer::language_menu(), Renderer::abha_entry_prompt()];
        for language in Language::ALL {
            docs.push(Renderer::identity_and_menu(language, &patient, "/next"));
            docs.push(Renderer::invalid_then_redirect(language, "/ivr/welcome"));
            docs.push(Renderer::prescription_then_close(language, Some(&record)));
            docs.push(Renderer::prescription_then_close(language, None));
            docs.push(Renderer::emergency_then_close(language, "info"));
            docs.push(Renderer::invalid_then_close(language));
        }
        docs.push(Renderer::abha_received_and_menu(&patient.abha_id, "/next"));

        for doc in docs {
            let xml = Twiml::render(&doc).expect("render");
            assert_eq!(Twiml::parse(&xml).expect("parse"), doc);
        }
    }

    #[test]
    fn closing_documents_end_with_goodbye_and_hangup() {
        let doc = Renderer::invalid_then_close(Language::Hindi);
        assert_eq!(
            doc.spoken_text(),
            vec!["अमान्य चयन।", "आरोग्यम का उपयोग करने के लिए धन्यवाद। अलविदा।"]
        );
        assert!(doc.ends_with_hangup());
        assert!(doc.find_gather().is_none());
    }
}

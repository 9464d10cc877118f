//! Voice menu state machine.
//!
//! A call is a sequence of independent webhook requests. Nothing is stored between them: the
//! state a request targets is the webhook path it arrived on, and everything learnt earlier in
//! the call travels in the query string of the callback URL the previous response embedded
//! ([`ForwardedParams`]).
//!
//! [`IvrMachine::advance`] is a pure function of `(state, forwarded params, digits)` apart from
//! reads of the [`ClinicalSource`]. It never fails because of caller input: every state has an
//! exhaustive `1` / `2` / anything-else branch.
//!
//! Invalid input policy: the caller always hears an invalid-selection message. Before a
//! language has been chosen the call is redirected to the welcome menu so the caller can try
//! again; once the call has reached the main menu it closes with the usual goodbye.

use crate::clinical::ClinicalSource;
use crate::config::{IvrConfig, IvrMode};
use crate::constants::{
    ABHA_ENTRY_PATH, ABHA_ID_PARAM, LANGUAGE_PARAM, LANGUAGE_SELECTION_PATH, MENU_SELECTION_PATH,
    WELCOME_PATH,
};
use crate::language::Language;
use crate::render::Renderer;
use crate::CoreResult;
use aarogyam_types::AbhaId;
use std::sync::Arc;
use twiml::{Twiml, VoiceResponse};

// ============================================================================
// States and inputs
// ============================================================================

/// A webhook the telephony platform can call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IvrState {
    Welcome,
    LanguageSelection,
    AbhaEntry,
    MenuSelection,
}

impl IvrState {
    pub const ALL: [IvrState; 4] = [
        IvrState::Welcome,
        IvrState::LanguageSelection,
        IvrState::AbhaEntry,
        IvrState::MenuSelection,
    ];

    pub fn path(self) -> &'static str {
        match self {
            IvrState::Welcome => WELCOME_PATH,
            IvrState::LanguageSelection => LANGUAGE_SELECTION_PATH,
            IvrState::AbhaEntry => ABHA_ENTRY_PATH,
            IvrState::MenuSelection => MENU_SELECTION_PATH,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.path() == path)
    }
}

/// A main-menu key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// `1`: hear the latest prescription.
    One,
    /// `2`: hear the emergency information.
    Two,
    /// Anything else, including no input.
    Invalid,
}

impl Selection {
    pub fn from_digits(digits: Option<&str>) -> Self {
        match digits {
            Some("1") => Selection::One,
            Some("2") => Selection::Two,
            _ => Selection::Invalid,
        }
    }
}

/// Call state carried between webhooks in the callback URL.
///
/// Unknown or blank values decode to `None`; they are never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardedParams {
    pub abha_id: Option<AbhaId>,
    pub language: Option<Language>,
}

impl ForwardedParams {
    pub fn new(abha_id: AbhaId, language: Language) -> Self {
        Self {
            abha_id: Some(abha_id),
            language: Some(language),
        }
    }

    /// Build from raw query values as received by a webhook.
    pub fn from_raw(abha_id: Option<&str>, language: Option<&str>) -> Self {
        Self {
            abha_id: AbhaId::from_optional(abha_id),
            language: language.and_then(Language::from_digit),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// Unrelated keys are ignored; a repeated key keeps its last value.
    pub fn from_query(query: &str) -> Self {
        let mut abha_id = None;
        let mut language = None;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match decode_component(key).as_str() {
                ABHA_ID_PARAM => abha_id = Some(value),
                LANGUAGE_PARAM => language = Some(value),
                _ => {}
            }
        }
        Self::from_raw(abha_id.as_deref(), language.as_deref())
    }

    /// Encode as a query string, `abhaId` first. Absent values are omitted.
    pub fn to_query(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(abha_id) = &self.abha_id {
            pairs.push(format!(
                "{ABHA_ID_PARAM}={}",
                urlencoding::encode(abha_id.as_str())
            ));
        }
        if let Some(language) = self.language {
            pairs.push(format!("{LANGUAGE_PARAM}={}", language.digit()));
        }
        pairs.join("&")
    }

    /// Callback URL for `state` carrying these parameters.
    pub fn callback_url(&self, state: IvrState) -> String {
        let query = self.to_query();
        if query.is_empty() {
            state.path().to_owned()
        } else {
            format!("{}?{query}", state.path())
        }
    }
}

/// Split a callback URL produced by [`ForwardedParams::callback_url`] back into its parts.
pub fn parse_callback(url: &str) -> Option<(IvrState, ForwardedParams)> {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let state = IvrState::from_path(path)?;
    Some((state, ForwardedParams::from_query(query)))
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Where the call goes after a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The platform collects digits and calls this state next.
    Await(IvrState),
    /// The platform is sent straight to this state.
    Restart(IvrState),
    /// The call ends.
    Hangup,
}

/// Outcome of one webhook request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub next: Transition,
    pub response: VoiceResponse,
}

impl Step {
    /// The response as TwiML text.
    pub fn to_twiml(&self) -> CoreResult<String> {
        Ok(Twiml::render(&self.response)?)
    }
}

/// The voice menu.
#[derive(Clone)]
pub struct IvrMachine {
    config: IvrConfig,
    source: Arc<dyn ClinicalSource>,
}

impl IvrMachine {
    pub fn new(config: IvrConfig, source: Arc<dyn ClinicalSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &IvrConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn ClinicalSource> {
        &self.source
    }

    /// Compute the response to a webhook request.
    ///
    /// # Arguments
    ///
    /// * `state` - The webhook that was called.
    /// * `params` - Call state decoded from the request's query string.
    /// * `digits` - The `Digits` field Twilio posts after a `Gather`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error only if the clinical data source fails. Caller input never errors.
    pub fn advance(
        &self,
        state: IvrState,
        params: &ForwardedParams,
        digits: Option<&str>,
    ) -> CoreResult<Step> {
        let step = match state {
            IvrState::Welcome => self.welcome(),
            IvrState::LanguageSelection => self.language_selection(digits)?,
            IvrState::AbhaEntry => self.abha_entry(digits),
            IvrState::MenuSelection => self.menu_selection(params, digits)?,
        };
        tracing::debug!(?state, next = ?step.next, "ivr transition");
        Ok(step)
    }

    fn welcome(&self) -> Step {
        match self.config.mode() {
            IvrMode::LanguageMenu => Step {
                next: Transition::Await(IvrState::LanguageSelection),
                response: Renderer::language_menu(),
            },
            IvrMode::AbhaEntry => Step {
                next: Transition::Await(IvrState::AbhaEntry),
                response: Renderer::abha_entry_prompt(),
            },
        }
    }

    fn language_selection(&self, digits: Option<&str>) -> CoreResult<Step> {
        let Some(language) = digits.and_then(Language::from_digit) else {
            return Ok(self.restart(digits));
        };

        let caller = self.source.caller()?;
        let forwarded = ForwardedParams::new(caller.abha_id.clone(), language);
        let action = forwarded.callback_url(IvrState::MenuSelection);
        Ok(Step {
            next: Transition::Await(IvrState::MenuSelection),
            response: Renderer::identity_and_menu(language, &caller, &action),
        })
    }

    fn abha_entry(&self, digits: Option<&str>) -> Step {
        let keyed = AbhaId::from_optional(digits)
            .filter(|id| id.as_str().bytes().all(|b| b.is_ascii_digit()));
        let Some(abha_id) = keyed else {
            return self.restart(digits);
        };

        if !abha_id.is_abha_number() {
            tracing::warn!("accepting ABHA id that is not 14 digits long");
        }
        let forwarded = ForwardedParams::new(abha_id.clone(), Language::English);
        let action = forwarded.callback_url(IvrState::MenuSelection);
        Step {
            next: Transition::Await(IvrState::MenuSelection),
            response: Renderer::abha_received_and_menu(&abha_id, &action),
        }
    }

    fn menu_selection(&self, params: &ForwardedParams, digits: Option<&str>) -> CoreResult<Step> {
        let language = params.language.unwrap_or_else(|| {
            let fallback = self.config.fallback_language();
            tracing::warn!(%fallback, "menu selection without a recognised language");
            fallback
        });
        let abha_id = match &params.abha_id {
            Some(abha_id) => abha_id.clone(),
            None => self.source.caller()?.abha_id,
        };

        let response = match Selection::from_digits(digits) {
            Selection::One => {
                let latest = self.source.latest_prescription(&abha_id)?;
                Renderer::prescription_then_close(language, latest.as_ref())
            }
            Selection::Two => {
                let info = self.source.emergency_info(&abha_id, language)?;
                Renderer::emergency_then_close(language, &info)
            }
            Selection::Invalid => Renderer::invalid_then_close(language),
        };
        Ok(Step {
            next: Transition::Hangup,
            response,
        })
    }

    fn restart(&self, digits: Option<&str>) -> Step {
        tracing::info!(digits = digits.unwrap_or(""), "invalid selection, restarting call");
        Step {
            next: Transition::Restart(IvrState::Welcome),
            response: Renderer::invalid_then_redirect(
                self.config.fallback_language(),
                IvrState::Welcome.path(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::{MockClinicalData, PatientProfile, PrescriptionRecord};
    use crate::{CoreError, CoreResult};

    const INVALID_INPUTS: [Option<&str>; 10] = [
        None,
        Some(""),
        Some("0"),
        Some("3"),
        Some("9"),
        Some("12"),
        Some("*"),
        Some("#"),
        Some(" 1"),
        Some("one"),
    ];

    fn machine(mode: IvrMode) -> IvrMachine {
        IvrMachine::new(
            IvrConfig::new(mode, Language::English),
            Arc::new(MockClinicalData::seed().unwrap()),
        )
    }

    fn bilingual() -> IvrMachine {
        machine(IvrMode::LanguageMenu)
    }

    fn menu_params(language: &str) -> ForwardedParams {
        ForwardedParams::from_raw(Some("X"), Some(language))
    }

    #[test]
    fn welcome_offers_english_then_hindi() {
        let step = bilingual()
            .advance(IvrState::Welcome, &ForwardedParams::default(), None)
            .unwrap();
        assert_eq!(step.next, Transition::Await(IvrState::LanguageSelection));

        let spoken = step.response.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[0].language.as_deref(), Some("en-IN"));
        assert_eq!(spoken[1].language.as_deref(), Some("hi-IN"));

        let gathers: Vec<_> = step
            .response
            .verbs()
            .iter()
            .filter(|v| matches!(v, twiml::Verb::Gather(_)))
            .collect();
        assert_eq!(gathers.len(), 1);
        let gather = step.response.find_gather().unwrap();
        assert_eq!(gather.num_digits, Some(1));
        assert_eq!(gather.action.as_deref(), Some("/ivr/handle-language-selection"));
        assert_eq!(gather.method, Some(twiml::Method::Post));
    }

    #[test]
    fn welcome_ignores_any_input() {
        let m = bilingual();
        let plain = m.advance(IvrState::Welcome, &ForwardedParams::default(), None).unwrap();
        let noisy = m
            .advance(IvrState::Welcome, &menu_params("2"), Some("7"))
            .unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn english_selection_confirms_identity_and_forwards_language() {
        let step = bilingual()
            .advance(IvrState::LanguageSelection, &ForwardedParams::default(), Some("1"))
            .unwrap();
        assert_eq!(step.next, Transition::Await(IvrState::MenuSelection));
        assert_eq!(
            step.response.spoken_text()[0],
            "Yasser Ahmed, ABHA ID 63047337131610."
        );

        let action = step.response.find_gather().unwrap().action.clone().unwrap();
        assert!(action.contains("abhaId=63047337131610&language=1"));
        assert!(step.response.redirect_target().is_none());
        assert!(!step.response.ends_with_hangup());
    }

    #[test]
    fn hindi_selection_uses_hindi_prompts() {
        let step = bilingual()
            .advance(IvrState::LanguageSelection, &ForwardedParams::default(), Some("2"))
            .unwrap();
        let spoken = step.response.spoken();
        assert!(spoken.iter().all(|s| s.language.as_deref() == Some("hi-IN")));
        assert_eq!(spoken[0].plain_text(), "यासिर अहमद, आभा आईडी 63047337131610।");
        let action = step.response.find_gather().unwrap().action.clone().unwrap();
        assert!(action.ends_with("language=2"));
    }

    #[test]
    fn language_round_trips_through_callback_url() {
        let m = bilingual();
        for language in Language::ALL {
            let step = m
                .advance(
                    IvrState::LanguageSelection,
                    &ForwardedParams::default(),
                    Some(language.digit()),
                )
                .unwrap();
            let action = step.response.find_gather().unwrap().action.clone().unwrap();
            let (state, params) = parse_callback(&action).expect("callback url");
            assert_eq!(state, IvrState::MenuSelection);
            assert_eq!(params.language, Some(language));
            assert_eq!(params.abha_id.unwrap().as_str(), "63047337131610");
        }
    }

    #[test]
    fn invalid_language_selection_redirects_to_welcome() {
        let m = bilingual();
        for digits in INVALID_INPUTS {
            let step = m
                .advance(IvrState::LanguageSelection, &ForwardedParams::default(), digits)
                .unwrap();
            assert_eq!(step.next, Transition::Restart(IvrState::Welcome), "{digits:?}");
            assert_eq!(step.response.spoken_text(), vec!["Invalid selection."]);
            assert_eq!(step.response.redirect_target(), Some("/ivr/welcome"));
            assert!(step.response.find_gather().is_none());
            assert!(!step.response.ends_with_hangup());
            assert!(matches!(
                step.response.verbs().last(),
                Some(twiml::Verb::Redirect(_))
            ));
        }
    }

    #[test]
    fn invalid_menu_selection_closes_the_call() {
        let m = bilingual();
        for language in ["1", "2", "", "7"] {
            for digits in INVALID_INPUTS {
                let step = m
                    .advance(IvrState::MenuSelection, &menu_params(language), digits)
                    .unwrap();
                assert_eq!(step.next, Transition::Hangup);
                assert!(step.response.ends_with_hangup());
                assert!(step.response.find_gather().is_none());
                assert!(step.response.redirect_target().is_none());
            }
        }
    }

    #[test]
    fn english_prescription_is_read_then_call_ends() {
        let step = bilingual()
            .advance(IvrState::MenuSelection, &menu_params("1"), Some("1"))
            .unwrap();
        let spoken = step.response.spoken_text();
        assert_eq!(spoken.len(), 2);
        assert!(spoken[0].contains("Dr. Priya Sharma"));
        let first = spoken[0]
            .find("Paracetamol 500mg, 1 tablet, Twice daily for 5 days")
            .unwrap();
        let second = spoken[0]
            .find("Cetirizine 10mg, 1 tablet, Once daily for 7 days")
            .unwrap();
        assert!(first < second);
        assert_eq!(spoken[1], "Thank you for using Aarogyam. Goodbye.");
        assert!(step.response.ends_with_hangup());
    }

    #[test]
    fn emergency_info_is_read_in_selected_language() {
        let m = bilingual();
        let en = m
            .advance(IvrState::MenuSelection, &menu_params("1"), Some("2"))
            .unwrap();
        assert!(en.response.spoken_text()[0]
            .starts_with("Your emergency medical information is: Patient has a severe allergy"));

        let hi = m
            .advance(IvrState::MenuSelection, &menu_params("2"), Some("2"))
            .unwrap();
        assert!(hi.response.spoken_text()[0].starts_with("आपकी आपातकालीन चिकित्सा जानकारी है:"));
    }

    #[test]
    fn hindi_invalid_menu_selection() {
        let step = bilingual()
            .advance(IvrState::MenuSelection, &menu_params("2"), Some("9"))
            .unwrap();
        assert_eq!(step.response.spoken_text()[0], "अमान्य चयन।");
        assert!(step.response.ends_with_hangup());
        assert!(step.response.find_gather().is_none());
    }

    #[test]
    fn missing_language_falls_back_to_configured_language() {
        let params = ForwardedParams::from_raw(Some("X"), None);
        let english = bilingual()
            .advance(IvrState::MenuSelection, &params, Some("9"))
            .unwrap();
        assert_eq!(english.response.spoken_text()[0], "Invalid selection.");

        let hindi_first = IvrMachine::new(
            IvrConfig::new(IvrMode::LanguageMenu, Language::Hindi),
            Arc::new(MockClinicalData::seed().unwrap()),
        );
        let unknown = ForwardedParams::from_raw(Some("X"), Some("fr"));
        let step = hindi_first
            .advance(IvrState::MenuSelection, &unknown, Some("9"))
            .unwrap();
        assert_eq!(step.response.spoken_text()[0], "अमान्य चयन।");
    }

    #[test]
    fn menu_selection_without_abha_id_uses_caller() {
        let params = ForwardedParams::from_raw(None, Some("1"));
        let step = bilingual()
            .advance(IvrState::MenuSelection, &params, Some("1"))
            .unwrap();
        assert!(step.response.spoken_text()[0].contains("Dr. Priya Sharma"));
    }

    #[test]
    fn abha_entry_mode_collects_fourteen_digits() {
        let m = machine(IvrMode::AbhaEntry);
        let welcome = m.advance(IvrState::Welcome, &ForwardedParams::default(), None).unwrap();
        assert_eq!(welcome.next, Transition::Await(IvrState::AbhaEntry));
        let gather = welcome.response.find_gather().unwrap();
        assert_eq!(gather.num_digits, Some(14));
        assert_eq!(gather.action.as_deref(), Some("/ivr/handle-abha-id"));

        let entered = m
            .advance(IvrState::AbhaEntry, &ForwardedParams::default(), Some("12345678901234"))
            .unwrap();
        assert_eq!(
            entered.response.spoken_text()[0],
            "Thank you. You have entered 12345678901234."
        );
        let action = entered.response.find_gather().unwrap().action.clone().unwrap();
        assert_eq!(
            action,
            "/ivr/handle-menu-selection?abhaId=12345678901234&language=1"
        );

        let empty = m
            .advance(IvrState::AbhaEntry, &ForwardedParams::default(), Some(""))
            .unwrap();
        assert_eq!(empty.next, Transition::Restart(IvrState::Welcome));
    }

    #[test]
    fn abha_entry_with_non_digit_keys_is_invalid() {
        let m = machine(IvrMode::AbhaEntry);
        for digits in ["12\u{1}34", "12\u{1}\u{b}34", "12*34", "abc"] {
            let step = m
                .advance(IvrState::AbhaEntry, &ForwardedParams::default(), Some(digits))
                .unwrap();
            assert_eq!(step.next, Transition::Restart(IvrState::Welcome), "{digits:?}");
            assert_eq!(step.response.spoken_text(), vec!["Invalid selection."]);

            let xml = step.to_twiml().expect("render");
            assert!(!xml.contains('\u{1}'));
            assert!(!xml.contains('\u{b}'));
        }
    }

    #[test]
    fn every_response_round_trips_through_twiml() {
        let machines = [machine(IvrMode::LanguageMenu), machine(IvrMode::AbhaEntry)];
        let inputs = [None, Some("1"), Some("2"), Some("9"), Some("63047337131610")];
        let params = [
            ForwardedParams::default(),
            menu_params("1"),
            menu_params("2"),
            ForwardedParams::from_raw(Some("a&b=c"), Some("zz")),
        ];
        for m in &machines {
            for state in IvrState::ALL {
                for p in &params {
                    for digits in inputs {
                        let step = m.advance(state, p, digits).unwrap();
                        let xml = step.to_twiml().expect("render");
                        assert_eq!(twiml::Twiml::parse(&xml).expect("parse"), step.response);
                    }
                }
            }
        }
    }

    #[test]
    fn forwarded_params_encode_and_decode() {
        let params = ForwardedParams::new(AbhaId::new("a b&c").unwrap(), Language::Hindi);
        let query = params.to_query();
        assert_eq!(query, "abhaId=a%20b%26c&language=2");
        assert_eq!(ForwardedParams::from_query(&query), params);
        assert_eq!(ForwardedParams::from_query("abhaId=a+b%26c&language=2&x=1"), params);
        assert_eq!(ForwardedParams::from_query(""), ForwardedParams::default());
        assert_eq!(
            ForwardedParams::from_query("language=3"),
            ForwardedParams::default()
        );
        assert_eq!(ForwardedParams::default().callback_url(IvrState::Welcome), "/ivr/welcome");
    }

    #[test]
    fn parse_callback_rejects_unknown_paths() {
        assert!(parse_callback("/ivr/unknown?language=1").is_none());
        assert_eq!(
            parse_callback("/ivr/welcome"),
            Some((IvrState::Welcome, ForwardedParams::default()))
        );
    }

    struct BrokenSource;

    impl ClinicalSource for BrokenSource {
        fn caller(&self) -> CoreResult<PatientProfile> {
            Err(CoreError::InvalidInput("offline".into()))
        }
        fn prescriptions(&self, _: &AbhaId) -> CoreResult<Vec<PrescriptionRecord>> {
            Err(CoreError::InvalidInput("offline".into()))
        }
        fn emergency_info(&self, _: &AbhaId, _: Language) -> CoreResult<String> {
            Err(CoreError::InvalidInput("offline".into()))
        }
    }

    #[test]
    fn data_source_failures_propagate_but_input_errors_do_not() {
        let m = IvrMachine::new(IvrConfig::default(), Arc::new(BrokenSource));
        assert!(m
            .advance(IvrState::MenuSelection, &menu_params("1"), Some("1"))
            .is_err());
        assert!(m
            .advance(IvrState::LanguageSelection, &ForwardedParams::default(), Some("1"))
            .is_err());
        assert!(m
            .advance(IvrState::MenuSelection, &menu_params("1"), Some("5"))
            .is_ok());
        assert!(m
            .advance(IvrState::LanguageSelection, &ForwardedParams::default(), Some("5"))
            .is_ok());
    }
}

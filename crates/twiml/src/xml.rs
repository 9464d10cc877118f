//! TwiML serialisation.
//!
//! Rendering always validates the document first, so a malformed [`VoiceResponse`] never reaches
//! the platform. Parsing is strict: unknown verbs, unknown attributes and stray text are errors.
//! It exists so rendered documents can be checked by reading them back.

use crate::document::{Gather, Method, Redirect, Say, Verb, VoiceResponse};
use crate::{TwimlError, TwimlResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

/// TwiML operations.
///
/// This is a zero-sized type used for namespacing TwiML operations.
/// All methods are associated functions.
pub struct Twiml;

impl Twiml {
    /// Render a voice document as TwiML text.
    ///
    /// # Errors
    ///
    /// Returns [`TwimlError::InvalidDocument`] if the document breaks a structural invariant, or
    /// [`TwimlError::Xml`] if writing fails.
    pub fn render(response: &VoiceResponse) -> TwimlResult<String> {
        response.validate()?;

        let mut writer = Writer::new(Vec::new());
        write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write(&mut writer, Event::Start(BytesStart::new("Response")))?;
        for verb in response.verbs() {
            write_verb(&mut writer, verb)?;
        }
        write(&mut writer, Event::End(BytesEnd::new("Response")))?;

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    /// Parse TwiML text back into a voice document.
    ///
    /// # Errors
    ///
    /// Returns [`TwimlError`] if:
    /// - the text is not well-formed XML,
    /// - there is no single `<Response>` root,
    /// - an unknown verb, attribute or stray text is present,
    /// - the parsed document breaks a structural invariant.
    pub fn parse(xml_text: &str) -> TwimlResult<VoiceResponse> {
        let mut reader = Reader::from_str(xml_text);
        let mut response: Option<VoiceResponse> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(text) => ensure_blank(&text)?,
                Event::Start(start) => {
                    expect_root(&start, response.is_some())?;
                    response = Some(read_verbs(&mut reader)?);
                }
                Event::Empty(start) => {
                    expect_root(&start, response.is_some())?;
                    response = Some(VoiceResponse::new());
                }
                Event::Eof => break,
                other => return Err(unexpected(&other, "document")),
            }
        }

        let response = response
            .ok_or_else(|| TwimlError::Translation("missing <Response> root element".into()))?;
        response.validate()?;
        Ok(response)
    }
}

// ============================================================================
// Writing (internal)
// ============================================================================

fn write_verb(writer: &mut Writer<Vec<u8>>, verb: &Verb) -> TwimlResult<()> {
    match verb {
        Verb::Say(say) => write_say(writer, say),
        Verb::Gather(gather) => {
            let mut start = BytesStart::new("Gather");
            if let Some(num_digits) = gather.num_digits {
                start.push_attribute(("numDigits", num_digits.to_string().as_str()));
            }
            if let Some(action) = &gather.action {
                start.push_attribute(("action", action.as_str()));
            }
            if let Some(method) = gather.method {
                start.push_attribute(("method", method.to_wire()));
            }
            if gather.prompts.is_empty() {
                return write(writer, Event::Empty(start));
            }
            write(writer, Event::Start(start))?;
            for prompt in &gather.prompts {
                write_say(writer, prompt)?;
            }
            write(writer, Event::End(BytesEnd::new("Gather")))
        }
        Verb::Redirect(redirect) => {
            let mut start = BytesStart::new("Redirect");
            if let Some(method) = redirect.method {
                start.push_attribute(("method", method.to_wire()));
            }
            write(writer, Event::Start(start))?;
            write(writer, Event::Text(BytesText::new(&redirect.url)))?;
            write(writer, Event::End(BytesEnd::new("Redirect")))
        }
        Verb::Hangup => write(writer, Event::Empty(BytesStart::new("Hangup"))),
    }
}

fn write_say(writer: &mut Writer<Vec<u8>>, say: &Say) -> TwimlResult<()> {
    let mut start = BytesStart::new("Say");
    if let Some(language) = &say.language {
        start.push_attribute(("language", language.as_str()));
    }
    if let Some(voice) = &say.voice {
        start.push_attribute(("voice", voice.as_str()));
    }
    if say.content.is_empty() {
        return write(writer, Event::Empty(start));
    }

    write(writer, Event::Start(start))?;
    for segment in &say.content {
        match segment {
            crate::Speech::Text(text) => write(writer, Event::Text(BytesText::new(text)))?,
            crate::Speech::Phoneme { alphabet, ph, text } => {
                let mut phoneme = BytesStart::new("phoneme");
                phoneme.push_attribute(("alphabet", alphabet.as_str()));
                phoneme.push_attribute(("ph", ph.as_str()));
                write(writer, Event::Start(phoneme))?;
                write(writer, Event::Text(BytesText::new(text)))?;
                write(writer, Event::End(BytesEnd::new("phoneme")))?;
            }
        }
    }
    write(writer, Event::End(BytesEnd::new("Say")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> TwimlResult<()> {
    writer.write_event(event).map_err(xml_error)
}

// ============================================================================
// Reading (internal)
// ============================================================================

fn read_verbs(reader: &mut Reader<&[u8]>) -> TwimlResult<VoiceResponse> {
    let mut response = VoiceResponse::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                let verb = match start.name().as_ref() {
                    b"Say" => Verb::Say(read_say(reader, &start)?),
                    b"Gather" => Verb::Gather(read_gather(reader, &start)?),
                    b"Redirect" => Verb::Redirect(read_redirect(reader, &start)?),
                    b"Hangup" => {
                        no_attributes(&start)?;
                        expect_end(reader, b"Hangup")?;
                        Verb::Hangup
                    }
                    _ => return Err(unknown_element(&start, "Response")),
                };
                response.push(verb);
            }
            Event::Empty(start) => {
                let verb = match start.name().as_ref() {
                    b"Say" => Verb::Say(say_attributes(&start)?),
                    b"Gather" => Verb::Gather(gather_attributes(&start)?),
                    b"Hangup" => {
                        no_attributes(&start)?;
                        Verb::Hangup
                    }
                    b"Redirect" => {
                        return Err(TwimlError::Translation(
                            "<Redirect> requires a URL".into(),
                        ))
                    }
                    _ => return Err(unknown_element(&start, "Response")),
                };
                response.push(verb);
            }
            Event::Text(text) => ensure_blank(&text)?,
            Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"Response" => return Ok(response),
            Event::Eof => return Err(unexpected_eof("Response")),
            other => return Err(unexpected(&other, "Response")),
        }
    }
}

fn read_say(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> TwimlResult<Say> {
    let mut say = say_attributes(start)?;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(text) => say = say.text(text.unescape().map_err(xml_error)?),
            Event::CData(data) => say = say.text(String::from_utf8_lossy(&data).into_owned()),
            Event::Start(el) if el.name().as_ref() == b"phoneme" => {
                let (alphabet, ph) = phoneme_attributes(&el)?;
                let text = read_text_until(reader, b"phoneme")?;
                say = say.phoneme(alphabet, ph, text);
            }
            Event::Empty(el) if el.name().as_ref() == b"phoneme" => {
                let (alphabet, ph) = phoneme_attributes(&el)?;
                say = say.phoneme(alphabet, ph, String::new());
            }
            Event::End(end) if end.name().as_ref() == b"Say" => return Ok(say),
            Event::Eof => return Err(unexpected_eof("Say")),
            other => return Err(unexpected(&other, "Say")),
        }
    }
}

fn read_gather(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> TwimlResult<Gather> {
    let mut gather = gather_attributes(start)?;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(el) if el.name().as_ref() == b"Say" => {
                gather.prompts.push(read_say(reader, &el)?);
            }
            Event::Empty(el) if el.name().as_ref() == b"Say" => {
                gather.prompts.push(say_attributes(&el)?);
            }
            Event::Text(text) => ensure_blank(&text)?,
            Event::Comment(_) => {}
            Event::End(end) if end.name().as_ref() == b"Gather" => return Ok(gather),
            Event::Eof => return Err(unexpected_eof("Gather")),
            other => return Err(unexpected(&other, "Gather")),
        }
    }
}

fn read_redirect(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> TwimlResult<Redirect> {
    let mut method = None;
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "method" => method = Some(parse_method(&value)?),
            other => return Err(unknown_attribute("Redirect", other)),
        }
    }
    let url = read_text_until(reader, b"Redirect")?;
    Ok(Redirect { url, method })
}

fn read_text_until(reader: &mut Reader<&[u8]>, name: &[u8]) -> TwimlResult<String> {
    let mut out = String::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(text) => out.push_str(&text.unescape().map_err(xml_error)?),
            Event::End(end) if end.name().as_ref() == name => return Ok(out),
            Event::Eof => return Err(unexpected_eof(&String::from_utf8_lossy(name))),
            other => return Err(unexpected(&other, &String::from_utf8_lossy(name))),
        }
    }
}

fn expect_end(reader: &mut Reader<&[u8]>, name: &[u8]) -> TwimlResult<()> {
    let text = read_text_until(reader, name)?;
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(TwimlError::Translation(format!(
            "<{}> must be empty",
            String::from_utf8_lossy(name)
        )))
    }
}

fn say_attributes(start: &BytesStart<'_>) -> TwimlResult<Say> {
    let mut say = Say::default();
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "language" => say.language = Some(value),
            "voice" => say.voice = Some(value),
            other => return Err(unknown_attribute("Say", other)),
        }
    }
    Ok(say)
}

fn gather_attributes(start: &BytesStart<'_>) -> TwimlResult<Gather> {
    let mut gather = Gather::default();
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "numDigits" => {
                let digits = value.parse::<u32>().map_err(|_| {
                    TwimlError::Translation(format!("invalid Gather numDigits: {value}"))
                })?;
                gather.num_digits = Some(digits);
            }
            "action" => gather.action = Some(value),
            "method" => gather.method = Some(parse_method(&value)?),
            other => return Err(unknown_attribute("Gather", other)),
        }
    }
    Ok(gather)
}

fn phoneme_attributes(start: &BytesStart<'_>) -> TwimlResult<(String, String)> {
    let mut alphabet = None;
    let mut ph = None;
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "alphabet" => alphabet = Some(value),
            "ph" => ph = Some(value),
            other => return Err(unknown_attribute("phoneme", other)),
        }
    }
    match (alphabet, ph) {
        (Some(alphabet), Some(ph)) => Ok((alphabet, ph)),
        _ => Err(TwimlError::Translation(
            "<phoneme> requires alphabet and ph".into(),
        )),
    }
}

fn no_attributes(start: &BytesStart<'_>) -> TwimlResult<()> {
    match attributes(start)?.into_iter().next() {
        None => Ok(()),
        Some((key, _)) => Err(unknown_attribute(
            &String::from_utf8_lossy(start.name().as_ref()),
            &key,
        )),
    }
}

fn attributes(start: &BytesStart<'_>) -> TwimlResult<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn parse_method(value: &str) -> TwimlResult<Method> {
    Method::from_wire(value)
        .ok_or_else(|| TwimlError::Translation(format!("invalid method: {value}")))
}

fn expect_root(start: &BytesStart<'_>, seen_root: bool) -> TwimlResult<()> {
    if start.name().as_ref() != b"Response" {
        return Err(unknown_element(start, "document"));
    }
    if seen_root {
        return Err(TwimlError::Translation(
            "more than one <Response> root element".into(),
        ));
    }
    Ok(())
}

fn ensure_blank(text: &BytesText<'_>) -> TwimlResult<()> {
    let text = text.unescape().map_err(xml_error)?;
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(TwimlError::Translation(format!(
            "unexpected text outside a verb: {:?}",
            text.trim()
        )))
    }
}

fn unknown_element(start: &BytesStart<'_>, parent: &str) -> TwimlError {
    TwimlError::Translation(format!(
        "unknown element <{}> in {parent}",
        String::from_utf8_lossy(start.name().as_ref())
    ))
}

fn unknown_attribute(element: &str, key: &str) -> TwimlError {
    TwimlError::Translation(format!("unknown attribute {key} on <{element}>"))
}

fn unexpected(event: &Event<'_>, parent: &str) -> TwimlError {
    TwimlError::Translation(format!("unexpected {event:?} in {parent}"))
}

fn unexpected_eof(parent: &str) -> TwimlError {
    TwimlError::Translation(format!("document ends inside <{parent}>"))
}

fn xml_error(err: impl std::fmt::Display) -> TwimlError {
    TwimlError::Xml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn welcome_like() -> VoiceResponse {
        VoiceResponse::new().gather(
            Gather::new()
                .num_digits(1)
                .action("/ivr/handle-language-selection")
                .method(Method::Post)
                .say(
                    Say::new("Welcome to ")
                        .language("en-IN")
                        .phoneme("ipa", "ɑːˈɾoːɡjəm", "Aarogyam")
                        .text(". For English, press 1."),
                )
                .say(Say::new("आरोग्यम में आपका स्वागत है। हिंदी के लिए, 2 दबाएं।").language("hi-IN")),
        )
    }

    #[test]
    fn renders_compact_document() {
        let doc = VoiceResponse::new()
            .say(Say::new("Invalid selection.").language("en-IN"))
            .redirect("/ivr/welcome");
        let xml = Twiml::render(&doc).expect("render");
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Say language="en-IN">Invalid selection.</Say><Redirect>/ivr/welcome</Redirect></Response>"#
        );
    }

    #[test]
    fn renders_gather_attributes_and_phoneme() {
        let xml = Twiml::render(&welcome_like()).expect("render");
        assert!(xml.contains(
            r#"<Gather numDigits="1" action="/ivr/handle-language-selection" method="POST">"#
        ));
        assert!(xml.contains(r#"<phoneme alphabet="ipa" ph="ɑːˈɾoːɡjəm">Aarogyam</phoneme>"#));
        assert!(xml.contains(r#"<Say language="hi-IN">आरोग्यम"#));
    }

    #[test]
    fn round_trips_nested_document() {
        let doc = welcome_like();
        let xml = Twiml::render(&doc).expect("render");
        let reparsed = Twiml::parse(&xml).expect("parse");
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn escapes_query_string_in_action() {
        let doc = VoiceResponse::new().gather(
            Gather::new()
                .num_digits(1)
                .action("/ivr/handle-menu-selection?abhaId=63047337131610&language=1"),
        );
        let xml = Twiml::render(&doc).expect("render");
        assert!(xml.contains("abhaId=63047337131610&amp;language=1"));

        let reparsed = Twiml::parse(&xml).expect("parse");
        assert_eq!(
            reparsed.find_gather().and_then(|g| g.action.as_deref()),
            Some("/ivr/handle-menu-selection?abhaId=63047337131610&language=1")
        );
    }

    #[test]
    fn escapes_markup_in_speech() {
        let doc = VoiceResponse::new()
            .say(Say::new("Tom & Jerry <3"))
            .hangup();
        let xml = Twiml::render(&doc).expect("render");
        assert!(xml.contains("Tom &amp; Jerry &lt;3"));
        assert_eq!(Twiml::parse(&xml).expect("parse"), doc);
    }

    #[test]
    fn refuses_to_render_invalid_document() {
        let doc = VoiceResponse::new().gather(Gather::new()).hangup();
        assert!(matches!(
            Twiml::render(&doc),
            Err(TwimlError::InvalidDocument(_))
        ));
    }

    #[test]
    fn parses_indented_platform_markup() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say language="en-IN">Thank you.</Say>
    <Hangup/>
</Response>"#;
        let doc = Twiml::parse(input).expect("parse");
        assert_eq!(doc.spoken_text(), vec!["Thank you."]);
        assert!(doc.ends_with_hangup());
    }

    #[test]
    fn strict_parsing_rejects_unknown_verbs_and_attributes() {
        let unknown_verb = r#"<Response><Play>beep.mp3</Play><Hangup/></Response>"#;
        let err = Twiml::parse(unknown_verb).expect_err("unknown verb");
        assert!(err.to_string().contains("Play"));

        let unknown_attr = r#"<Response><Say loop="2">x</Say><Hangup/></Response>"#;
        let err = Twiml::parse(unknown_attr).expect_err("unknown attribute");
        assert!(err.to_string().contains("loop"));
    }

    #[test]
    fn parsing_enforces_document_invariants() {
        let input = r#"<Response><Gather numDigits="1"/><Hangup/></Response>"#;
        assert!(matches!(
            Twiml::parse(input),
            Err(TwimlError::InvalidDocument(_))
        ));
    }

    #[test]
    fn rejects_missing_root_and_stray_text() {
        assert!(Twiml::parse(r#"<?xml version="1.0"?>"#).is_err());
        assert!(Twiml::parse("<Response>hello<Hangup/></Response>").is_err());
        assert!(Twiml::parse("<Response><Hangup/>").is_err());
    }

    #[test]
    fn control_characters_never_reach_the_wire() {
        let doc = VoiceResponse::new()
            .say(Say::new("You have entered 12\u{1}\u{b}34.").language("en-IN"))
            .hangup();
        assert!(matches!(
            Twiml::render(&doc),
            Err(TwimlError::InvalidDocument(_))
        ));

        let raw = "<Response><Say>12\u{1}34</Say><Hangup/></Response>";
        assert!(Twiml::parse(raw).is_err());
        let referenced = "<Response><Say>12&#1;34</Say><Hangup/></Response>";
        assert!(Twiml::parse(referenced).is_err());
    }
}

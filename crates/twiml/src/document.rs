//! Voice document model.
//!
//! A [`VoiceResponse`] is an ordered list of verbs. Spoken verbs (`Say`) may appear any number of
//! times; exactly one *terminal* verb closes the document:
//! - `Gather`: wait for more key presses and call back,
//! - `Redirect`: divert the call to another webhook,
//! - `Hangup`: end the call.
//!
//! The terminal verb is always last. A `Gather` never shares a document with a `Hangup`.

use crate::{TwimlError, TwimlResult};

// ============================================================================
// Public verb types
// ============================================================================

/// HTTP method the platform uses when following a callback URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub(crate) fn to_wire(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    pub(crate) fn from_wire(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// One segment of spoken content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Speech {
    /// Plain text, synthesised as written.
    Text(String),
    /// A word with an explicit pronunciation (SSML `<phoneme>`).
    Phoneme {
        alphabet: String,
        ph: String,
        text: String,
    },
}

/// A line of synthesised speech.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Say {
    /// BCP-47 tag selecting the speech-synthesis language, e.g. `en-IN`.
    pub language: Option<String>,
    /// Optional platform voice name.
    pub voice: Option<String>,
    pub content: Vec<Speech>,
}

impl Say {
    /// A `Say` holding a single plain-text segment.
    pub fn new(text: impl Into<String>) -> Self {
        Self::default().text(text)
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Appends plain text, merging with a preceding text segment.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        match self.content.last_mut() {
            Some(Speech::Text(prev)) => prev.push_str(&text),
            _ => self.content.push(Speech::Text(text)),
        }
        self
    }

    /// Appends a word spoken with an explicit pronunciation.
    pub fn phoneme(
        mut self,
        alphabet: impl Into<String>,
        ph: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.content.push(Speech::Phoneme {
            alphabet: alphabet.into(),
            ph: ph.into(),
            text: text.into(),
        });
        self
    }

    /// The words a listener hears, with pronunciation hints flattened to their text.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|segment| match segment {
                Speech::Text(text) => text.as_str(),
                Speech::Phoneme { text, .. } => text.as_str(),
            })
            .collect()
    }
}

/// Collects touch-tone digits and calls `action` with them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gather {
    pub num_digits: Option<u32>,
    pub action: Option<String>,
    pub method: Option<Method>,
    /// Prompts spoken while waiting; a key press interrupts them.
    pub prompts: Vec<Say>,
}

impl Gather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_digits(mut self, num_digits: u32) -> Self {
        self.num_digits = Some(num_digits);
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn say(mut self, say: Say) -> Self {
        self.prompts.push(say);
        self
    }
}

/// Transfers control of the call to another TwiML URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub url: String,
    pub method: Option<Method>,
}

/// A single TwiML verb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Redirect(Redirect),
    Hangup,
}

impl Verb {
    fn is_terminal(&self) -> bool {
        !matches!(self, Verb::Say(_))
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Verb::Say(_) => "Say",
            Verb::Gather(_) => "Gather",
            Verb::Redirect(_) => "Redirect",
            Verb::Hangup => "Hangup",
        }
    }
}

// ============================================================================
// Voice response
// ============================================================================

/// An ordered voice document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, say: Say) -> Self {
        self.verbs.push(Verb::Say(say));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect(Redirect {
            url: url.into(),
            method: None,
        }));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub(crate) fn push(&mut self, verb: Verb) {
        self.verbs.push(verb);
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Every `Say` in document order, including prompts nested in a `Gather`.
    pub fn spoken(&self) -> Vec<&Say> {
        let mut out = Vec::new();
        for verb in &self.verbs {
            match verb {
                Verb::Say(say) => out.push(say),
                Verb::Gather(gather) => out.extend(gather.prompts.iter()),
                Verb::Redirect(_) | Verb::Hangup => {}
            }
        }
        out
    }

    /// Plain text of every spoken line in document order.
    pub fn spoken_text(&self) -> Vec<String> {
        self.spoken().into_iter().map(Say::plain_text).collect()
    }

    pub fn find_gather(&self) -> Option<&Gather> {
        self.verbs.iter().find_map(|verb| match verb {
            Verb::Gather(gather) => Some(gather),
            _ => None,
        })
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.verbs.iter().find_map(|verb| match verb {
            Verb::Redirect(redirect) => Some(redirect.url.as_str()),
            _ => None,
        })
    }

    pub fn ends_with_hangup(&self) -> bool {
        matches!(self.verbs.last(), Some(Verb::Hangup))
    }

    /// Check the structural invariants of the document.
    ///
    /// # Errors
    ///
    /// Returns [`TwimlError::InvalidDocument`] if:
    /// - the document has no terminal verb, or more than one,
    /// - the terminal verb is followed by anything,
    /// - a `Gather` asks for zero digits or a `Redirect` has an empty URL,
    /// - any text or attribute value holds a character XML 1.0 does not allow.
    pub fn validate(&self) -> TwimlResult<()> {
        let terminals: Vec<&Verb> = self.verbs.iter().filter(|v| v.is_terminal()).collect();
        match terminals.as_slice() {
            [] => {
                return Err(TwimlError::InvalidDocument(
                    "document has no Gather, Redirect or Hangup".into(),
                ))
            }
            [_] => {}
            many => {
                let names: Vec<&str> = many.iter().map(|v| v.wire_name()).collect();
                return Err(TwimlError::InvalidDocument(format!(
                    "document has more than one terminal verb: {}",
                    names.join(", ")
                )));
            }
        }

        if let Some(last) = self.verbs.last() {
            if !last.is_terminal() {
                return Err(TwimlError::InvalidDocument(
                    "instructions follow the terminal verb".into(),
                ));
            }
        }

        for verb in &self.verbs {
            match verb {
                Verb::Gather(gather) if gather.num_digits == Some(0) => {
                    return Err(TwimlError::InvalidDocument(
                        "Gather numDigits must be at least 1".into(),
                    ));
                }
                Verb::Redirect(redirect) if redirect.url.trim().is_empty() => {
                    return Err(TwimlError::InvalidDocument(
                        "Redirect URL cannot be empty".into(),
                    ));
                }
                _ => {}
            }
        }

        for verb in &self.verbs {
            match verb {
                Verb::Say(say) => check_say(say)?,
                Verb::Gather(gather) => {
                    check_xml_chars("Gather action", gather.action.as_deref())?;
                    for say in &gather.prompts {
                        check_say(say)?;
                    }
                }
                Verb::Redirect(redirect) => {
                    check_xml_chars("Redirect URL", Some(redirect.url.as_str()))?
                }
                Verb::Hangup => {}
            }
        }

        Ok(())
    }
}

fn check_say(say: &Say) -> TwimlResult<()> {
    check_xml_chars("Say language", say.language.as_deref())?;
    check_xml_chars("Say voice", say.voice.as_deref())?;
    for speech in &say.content {
        match speech {
            Speech::Text(text) => check_xml_chars("Say text", Some(text.as_str()))?,
            Speech::Phoneme { alphabet, ph, text } => {
                check_xml_chars("phoneme alphabet", Some(alphabet.as_str()))?;
                check_xml_chars("phoneme ph", Some(ph.as_str()))?;
                check_xml_chars("phoneme text", Some(text.as_str()))?;
            }
        }
    }
    Ok(())
}

/// Control characters other than tab, newline and carriage return cannot appear in XML 1.0,
/// escaped or not.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= '\u{20}' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

fn check_xml_chars(field: &str, value: Option<&str>) -> TwimlResult<()> {
    let forbidden = value.and_then(|v| v.chars().find(|&c| !is_xml_char(c)));
    match forbidden {
        Some(c) => Err(TwimlError::InvalidDocument(format!(
            "{field} contains character U+{:04X}, which XML does not allow",
            c as u32
        ))),
        None => Ok(()),
    }
}

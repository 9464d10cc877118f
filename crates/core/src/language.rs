//! Languages offered by the voice menu.

use crate::constants::{ENGLISH_TTS_TAG, HINDI_TTS_TAG};
use crate::{CoreError, CoreResult};
use std::str::FromStr;

/// A language the caller can pick on the welcome menu.
///
/// On the wire a language is the key the caller pressed to choose it (`1` or `2`), which is what
/// the menu-selection callback URL carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Hindi];

    /// Key pressed to choose this language; also its query-string encoding.
    pub fn digit(self) -> &'static str {
        match self {
            Language::English => "1",
            Language::Hindi => "2",
        }
    }

    /// Exact inverse of [`Language::digit`]. Anything else is not a language.
    pub fn from_digit(digit: &str) -> Option<Self> {
        match digit {
            "1" => Some(Language::English),
            "2" => Some(Language::Hindi),
            _ => None,
        }
    }

    /// Speech-synthesis language tag for `Say` verbs.
    pub fn tts_tag(self) -> &'static str {
        match self {
            Language::English => ENGLISH_TTS_TAG,
            Language::Hindi => HINDI_TTS_TAG,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => f.write_str("English"),
            Language::Hindi => f.write_str("Hindi"),
        }
    }
}

/// Lenient parsing for configuration and command-line input.
///
/// Accepts the menu digit, an ISO code, a TTS tag or the English name, case-insensitively.
impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "en" | "en-in" | "english" => Ok(Language::English),
            "2" | "hi" | "hi-in" | "hindi" => Ok(Language::Hindi),
            other => Err(CoreError::InvalidInput(format!(
                "unknown language: {other:?} (expected english or hindi)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_round_trips() {
        for language in Language::ALL {
            assert_eq!(Language::from_digit(language.digit()), Some(language));
        }
    }

    #[test]
    fn from_digit_is_exact() {
        assert_eq!(Language::from_digit(" 1"), None);
        assert_eq!(Language::from_digit("en"), None);
        assert_eq!(Language::from_digit(""), None);
    }

    #[test]
    fn parses_configuration_spellings() {
        assert_eq!("Hindi".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!("hi-IN".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(" EN ".parse::<Language>().unwrap(), Language::English);
        assert_eq!("1".parse::<Language>().unwrap(), Language::English);
        assert!("tamil".parse::<Language>().is_err());
    }

    #[test]
    fn tts_tags() {
        assert_eq!(Language::English.tts_tag(), "en-IN");
        assert_eq!(Language::Hindi.tts_tag(), "hi-IN");
    }
}

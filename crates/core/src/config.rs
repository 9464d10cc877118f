//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the state machine, so no
//! environment variables are read while a webhook is being handled. The `*_from_env_value`
//! helpers take the raw value so binaries own the environment access and tests do not.

use crate::clinical::{ClinicalSource, MockClinicalData};
use crate::language::Language;
use crate::{CoreError, CoreResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Which call flow the welcome webhook starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IvrMode {
    /// Bilingual flow: choose a language, hear the demo patient's identity, pick a menu item.
    #[default]
    LanguageMenu,
    /// English-only flow: type a 14-digit ABHA number, then pick a menu item.
    AbhaEntry,
}

impl FromStr for IvrMode {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "language-menu" => Ok(IvrMode::LanguageMenu),
            "abha-entry" => Ok(IvrMode::AbhaEntry),
            other => Err(CoreError::InvalidInput(format!(
                "unknown IVR mode: {other:?} (expected language-menu or abha-entry)"
            ))),
        }
    }
}

impl std::fmt::Display for IvrMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IvrMode::LanguageMenu => f.write_str("language-menu"),
            IvrMode::AbhaEntry => f.write_str("abha-entry"),
        }
    }
}

/// IVR configuration resolved at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IvrConfig {
    mode: IvrMode,
    fallback_language: Language,
}

impl IvrConfig {
    pub fn new(mode: IvrMode, fallback_language: Language) -> Self {
        Self {
            mode,
            fallback_language,
        }
    }

    pub fn mode(&self) -> IvrMode {
        self.mode
    }

    /// Language used when a request carries no recognisable language.
    pub fn fallback_language(&self) -> Language {
        self.fallback_language
    }
}

/// Parse the IVR mode from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`IvrMode::LanguageMenu`].
pub fn ivr_mode_from_env_value(value: Option<String>) -> CoreResult<IvrMode> {
    non_blank(value)
        .map(|v| v.parse::<IvrMode>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse the fallback language from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns English.
pub fn fallback_language_from_env_value(value: Option<String>) -> CoreResult<Language> {
    non_blank(value)
        .map(|v| v.parse::<Language>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Load the clinical data source.
///
/// With no override the compiled-in demo data set is used.
pub fn load_clinical_source(override_file: Option<PathBuf>) -> CoreResult<Arc<dyn ClinicalSource>> {
    let data = match override_file {
        Some(path) => {
            tracing::info!("loading clinical data from {}", path.display());
            MockClinicalData::from_yaml_file(&path)?
        }
        None => MockClinicalData::seed()?,
    };
    Ok(Arc::new(data))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

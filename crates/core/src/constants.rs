//! Constants used throughout the Aarogyam core crate.
//!
//! Webhook paths and speech settings live here so the state machine, the renderer and the HTTP
//! layer agree on them.

/// Entry point for every inbound call.
pub const WELCOME_PATH: &str = "/ivr/welcome";

/// Callback receiving the language choice.
pub const LANGUAGE_SELECTION_PATH: &str = "/ivr/handle-language-selection";

/// Callback receiving a typed ABHA number (abha-entry mode).
pub const ABHA_ENTRY_PATH: &str = "/ivr/handle-abha-id";

/// Callback receiving the main-menu choice.
pub const MENU_SELECTION_PATH: &str = "/ivr/handle-menu-selection";

/// Query parameter carrying the caller's ABHA id between webhooks.
pub const ABHA_ID_PARAM: &str = "abhaId";

/// Query parameter carrying the selected language between webhooks.
pub const LANGUAGE_PARAM: &str = "language";

/// Speech-synthesis language tag for English prompts.
pub const ENGLISH_TTS_TAG: &str = "en-IN";

/// Speech-synthesis language tag for Hindi prompts.
pub const HINDI_TTS_TAG: &str = "hi-IN";

/// Service name, spoken with an explicit pronunciation in English prompts.
pub const BRAND_NAME: &str = "Aarogyam";

/// IPA pronunciation of [`BRAND_NAME`].
pub const BRAND_NAME_IPA: &str = "ɑːˈɾoːɡjəm";

/// Digits in a typed ABHA number.
pub const ABHA_ENTRY_DIGITS: u32 = aarogyam_types::ABHA_NUMBER_LEN as u32;


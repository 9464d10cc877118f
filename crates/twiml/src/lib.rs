//! TwiML wire/boundary support for the Aarogyam IVR.
//!
//! This crate provides the **voice document model** returned to the telephony platform on every
//! webhook and the **format helpers** that turn it into (and back from) TwiML markup:
//! - `Say` (with SSML `<phoneme>` segments), `Gather`, `Redirect` and `Hangup` verbs
//! - structural invariants checked before anything is serialised
//! - a strict parser used to verify that rendered documents round-trip
//!
//! The crate knows nothing about call flows, languages or patients. Those live in
//! `aarogyam-core`, which builds [`VoiceResponse`] values and hands them to [`Twiml::render`].

pub mod document;
pub mod xml;

pub use document::{Gather, Method, Redirect, Say, Speech, Verb, VoiceResponse};
pub use xml::Twiml;

/// Content type the telephony platform expects for voice documents.
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Errors returned by the `twiml` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum TwimlError {
    #[error("invalid voice document: {0}")]
    InvalidDocument(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`TwimlError`].
pub type TwimlResult<T> = Result<T, TwimlError>;

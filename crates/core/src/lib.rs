//! # Aarogyam Core
//!
//! Core logic for the Aarogyam voice health-records line.
//!
//! This crate holds everything a call needs apart from the transport:
//! - The voice menu state machine ([`ivr`]) and the words it speaks ([`render`])
//! - The clinical data source the menu reads from ([`clinical`])
//! - Runtime configuration resolved at startup ([`config`])
//!
//! **No transport concerns**: HTTP handlers, static file serving and the OpenAPI document belong
//! in `api-rest`.

pub mod clinical;
pub mod config;
pub mod constants;
pub mod error;
pub mod ivr;
pub mod language;
pub mod render;

pub use clinical::{
    ClinicalDataset, ClinicalSource, MedicationEntry, MockClinicalData, PatientProfile,
    PrescriptionRecord, PrescriptionStatus,
};
pub use config::{IvrConfig, IvrMode};
pub use error::{CoreError, CoreResult};
pub use ivr::{ForwardedParams, IvrMachine, IvrState, Selection, Step, Transition};
pub use language::Language;
pub use render::Renderer;

pub use aarogyam_types::AbhaId;

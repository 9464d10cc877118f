//! Mock clinical data provider.
//!
//! The voice menu reads three things about a caller: who they are, their prescriptions and their
//! emergency information. [`ClinicalSource`] is the seam for those reads. The only
//! implementation, [`MockClinicalData`], serves a static data set and ignores the ABHA id it is
//! given, so every caller hears the same demo patient's records.
//!
//! Data sets are YAML documents with the same shape as `data/clinical_seed.yaml`, which is
//! compiled in and used unless a file is configured.

use crate::language::Language;
use crate::{CoreError, CoreResult};
use aarogyam_types::{AbhaId, NonEmptyText};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use utoipa::ToSchema;

const SEED_YAML: &str = include_str!("../data/clinical_seed.yaml");

// ============================================================================
// Public domain-level types
// ============================================================================

/// Lifecycle of a prescription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PrescriptionStatus {
    Active,
    Completed,
}

/// One medicine on a prescription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MedicationEntry {
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    /// Doses left to take.
    pub remaining: u32,
}

/// A prescription as served by `GET /api/prescriptions/{abhaId}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionRecord {
    pub id: u32,
    #[schema(value_type = String)]
    pub doctor: NonEmptyText,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub status: PrescriptionStatus,
    pub medications: Vec<MedicationEntry>,
}

/// Text held once per supported language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalizedText {
    pub en: String,
    pub hi: String,
}

impl LocalizedText {
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::English => &self.en,
            Language::Hindi => &self.hi,
        }
    }
}

/// The caller whose records are read out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientProfile {
    pub abha_id: AbhaId,
    pub name: LocalizedText,
}

/// A complete mock data set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalDataset {
    pub patient: PatientProfile,
    pub emergency_info: LocalizedText,
    /// Most recent first.
    pub prescriptions: Vec<PrescriptionRecord>,
}

// ============================================================================
// Source trait
// ============================================================================

/// Read-only access to the clinical data the voice menu speaks.
///
/// Implementations must be shareable across concurrent webhook requests.
pub trait ClinicalSource: Send + Sync {
    /// Identity of the caller on the line.
    fn caller(&self) -> CoreResult<PatientProfile>;

    /// All prescriptions for `abha_id`, most recent first.
    fn prescriptions(&self, abha_id: &AbhaId) -> CoreResult<Vec<PrescriptionRecord>>;

    /// Emergency information for `abha_id`, in `language`.
    fn emergency_info(&self, abha_id: &AbhaId, language: Language) -> CoreResult<String>;

    /// The most recent prescription, if any.
    fn latest_prescription(&self, abha_id: &AbhaId) -> CoreResult<Option<PrescriptionRecord>> {
        Ok(self.prescriptions(abha_id)?.into_iter().next())
    }
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Static, identity-independent data set.
#[derive(Clone, Debug)]
pub struct MockClinicalData {
    dataset: ClinicalDataset,
}

impl MockClinicalData {
    /// The compiled-in demo data set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] only if the embedded seed file is malformed.
    pub fn seed() -> CoreResult<Self> {
        Self::from_yaml_str(SEED_YAML)
    }

    /// Parse a data set from YAML text.
    ///
    /// This uses `serde_path_to_error` so schema mismatches name the failing field, for example
    /// `prescriptions[2].medications[0].remaining`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if:
    /// - the YAML does not match the data set schema or contains unknown keys,
    /// - prescription ids are not unique,
    /// - prescriptions are not ordered most recent first.
    pub fn from_yaml_str(yaml_text: &str) -> CoreResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let dataset = match serde_path_to_error::deserialize::<_, ClinicalDataset>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CoreError::Translation(format!("at {path}: {source}")));
            }
        };

        validate_dataset(&dataset)?;
        Ok(Self { dataset })
    }

    /// Load a data set from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FileRead`] if the file cannot be read, otherwise as
    /// [`MockClinicalData::from_yaml_str`].
    pub fn from_yaml_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CoreError::FileRead)?;
        Self::from_yaml_str(&text)
    }

    pub fn dataset(&self) -> &ClinicalDataset {
        &self.dataset
    }
}

impl ClinicalSource for MockClinicalData {
    fn caller(&self) -> CoreResult<PatientProfile> {
        Ok(self.dataset.patient.clone())
    }

    fn prescriptions(&self, _abha_id: &AbhaId) -> CoreResult<Vec<PrescriptionRecord>> {
        Ok(self.dataset.prescriptions.clone())
    }

    fn emergency_info(&self, _abha_id: &AbhaId, language: Language) -> CoreResult<String> {
        Ok(self.dataset.emergency_info.get(language).to_owned())
    }

    fn latest_prescription(&self, _abha_id: &AbhaId) -> CoreResult<Option<PrescriptionRecord>> {
        Ok(self.dataset.prescriptions.first().cloned())
    }
}

fn validate_dataset(dataset: &ClinicalDataset) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for record in &dataset.prescriptions {
        if !seen.insert(record.id) {
            return Err(CoreError::InvalidInput(format!(
                "duplicate prescription id {}",
                record.id
            )));
        }
    }

    for pair in dataset.prescriptions.windows(2) {
        if pair[0].date < pair[1].date {
            return Err(CoreError::InvalidInput(format!(
                "prescriptions must be ordered most recent first (id {} dated {} precedes id {} dated {})",
                pair[0].id, pair[0].date, pair[1].id, pair[1].date
            )));
        }
    }

    Ok(())
}

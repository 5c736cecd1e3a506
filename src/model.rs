// Biomarker Entities
//
// The external entities the merge engine operates on. They are owned by
// the persistence collaborator's query layer and passed in by value; the
// engine never queries storage itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a biomarker configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(pub Uuid);

impl ConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a measurement record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A biomarker definition: a name bound to a unit, plus the optional
/// stoichiometric/assay hints the resolver consumes. Several configs may
/// share a normalized name while differing in unit; that is exactly the
/// condition that makes them merge candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerConfig {
    pub id: ConfigId,
    pub name: String,
    pub ucum_code: String,
    /// g/mol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_weight: Option<f64>,
    /// milli-IU per microgram
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
    pub approved: bool,
}

impl BiomarkerConfig {
    pub fn new(name: &str, ucum_code: &str) -> Self {
        BiomarkerConfig {
            id: ConfigId::new(),
            name: name.to_string(),
            ucum_code: ucum_code.to_string(),
            molecular_weight: None,
            conversion_factor: None,
            approved: true,
        }
    }

    pub fn with_molecular_weight(mut self, mw: f64) -> Self {
        self.molecular_weight = Some(mw);
        self
    }

    pub fn with_conversion_factor(mut self, factor: f64) -> Self {
        self.conversion_factor = Some(factor);
        self
    }
}

/// A single measurement. `value` carries numeric results; `text_value`
/// carries qualitative ones ("positive", "trace"). Only approved records
/// with a numeric value participate in conversion; the audit fields are
/// written by the merge executor and hold the pre-conversion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerRecord {
    pub id: RecordId,
    pub config_id: ConfigId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_value: Option<String>,
    pub ucum_code: String,
    pub approved: bool,
    /// Pre-merge value, unrounded, kept for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_value: Option<f64>,
    /// Pre-merge unit, kept for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit: Option<String>,
}

impl BiomarkerRecord {
    pub fn numeric(config: &BiomarkerConfig, value: f64) -> Self {
        BiomarkerRecord {
            id: RecordId::new(),
            config_id: config.id,
            value: Some(value),
            text_value: None,
            ucum_code: config.ucum_code.clone(),
            approved: true,
            original_value: None,
            original_unit: None,
        }
    }

    pub fn textual(config: &BiomarkerConfig, text: &str) -> Self {
        BiomarkerRecord {
            id: RecordId::new(),
            config_id: config.id,
            value: None,
            text_value: Some(text.to_string()),
            ucum_code: config.ucum_code.clone(),
            approved: true,
            original_value: None,
            original_unit: None,
        }
    }
}

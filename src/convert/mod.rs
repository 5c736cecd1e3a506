// Conversion Contract Types
//
// The typed vocabulary shared between the resolver and its callers:
// which method produced a value, the value itself, and the per-biomarker
// hints a caller may supply. Failure to convert is an expected,
// steady-state outcome and is represented as data, never as an Err.

pub mod resolver;

pub use resolver::{resolve, resolve_plain};

use serde::{Deserialize, Serialize};

/// How a conversion was (or was not) resolved. The variant order is the
/// total order of preference when several strategies are structurally
/// eligible; the resolver's strategy list is tested against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMethod {
    /// Standards-based dimensional conversion (also the no-op identity)
    Ucum,
    /// Mass <-> molar through a molar mass
    MolecularWeight,
    /// Mass <-> international activity through an assay factor
    ConversionFactor,
    /// Known equivalence the standards layer does not model
    SimpleMath,
    /// Clinically validated analyte-specific formula
    SpecialFormula,
    /// No strategy applied; carries no numeric result
    Failed,
}

/// Per-biomarker hints supplied by the caller. Overrides always win over
/// the knowledge-base defaults for the same biomarker name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biomarker_name: Option<String>,
    /// g/mol; must be positive when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_weight: Option<f64>,
    /// milli-IU per microgram; must be positive when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
}

impl ConversionConfig {
    /// Hints for a named biomarker with no overrides.
    pub fn named(biomarker_name: &str) -> Self {
        ConversionConfig {
            biomarker_name: Some(biomarker_name.to_string()),
            ..Default::default()
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

/// Outcome of a conversion attempt.
///
/// Invariant: `method == Failed` iff `value` is NaN and `error` is
/// present; for every other method `error` is absent and `value` is
/// finite. Callers must never read `value` off a failed result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub value: f64,
    pub method: ConversionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn ok(value: f64, method: ConversionMethod) -> Self {
        ConversionResult {
            value,
            method,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ConversionResult {
            value: f64::NAN,
            method: ConversionMethod::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.method == ConversionMethod::Failed
    }
}

impl PartialEq for ConversionResult {
    fn eq(&self, other: &Self) -> bool {
        let values_eq = (self.value.is_nan() && other.value.is_nan())
            || self.value.to_bits() == other.value.to_bits();
        values_eq && self.method == other.method && self.error == other.error
    }
}

// Unit Classification
//
// Categorizes a unit code into the semantic kind that decides which
// conversion strategy family applies. The kinds are deliberately coarse:
// only Mass, Molar, and InternationalActivity ever trigger the
// stoichiometric or assay-factor paths; everything else converts through
// the UCUM standards layer or the simple-math table.
//
// The pattern tables below are the single, auditable source of truth for
// classification; adding a unit kind is a change here, not a scatter of
// substring checks.

use serde::{Deserialize, Serialize};

use super::normalize::{is_opaque_label, normalize};

/// Semantic kind of a unit code, derived by pattern inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    /// Mass concentration or plain mass (kg, g, mg, ug, ng, pg numerator)
    Mass,
    /// Molar amount or concentration (mol, mmol, umol, nmol, pmol numerator)
    Molar,
    /// International-unit activity measure ([iU], mIU, uIU, with or
    /// without brackets); calibration-dependent, never mass-convertible
    /// without an assay factor
    InternationalActivity,
    /// Volume per volume (mL/dL and friends)
    VolumeRatio,
    /// Percentages, ratios, counts, opaque labels, time units
    Other,
}

/// Mass numerator tokens, relative scale handled by the resolver.
const MASS_TOKENS: &[&str] = &["kg", "g", "mg", "ug", "ng", "pg"];

/// Molar numerator tokens.
const MOLAR_TOKENS: &[&str] = &["mol", "mmol", "umol", "nmol", "pmol"];

/// Volume tokens accepted on either side of a volume ratio.
const VOLUME_TOKENS: &[&str] = &["l", "dl", "ml", "ul"];

/// International-unit numerators after bracket stripping: bare `iu` or
/// `iu` behind one SI prefix.
const ACTIVITY_TOKENS: &[&str] = &["iu", "kiu", "miu", "uiu", "niu"];

/// Classify a unit code by its normalized numerator token.
pub fn classify(unit: &str) -> UnitKind {
    if is_opaque_label(unit) {
        return UnitKind::Other;
    }
    let n = normalize(unit);
    let mut parts = n.split('/');
    let numerator = parts.next().unwrap_or("");
    let denominator = parts.next().unwrap_or("");

    if MOLAR_TOKENS.contains(&numerator) {
        return UnitKind::Molar;
    }
    if MASS_TOKENS.contains(&numerator) {
        return UnitKind::Mass;
    }
    let unbracketed: String = numerator.chars().filter(|c| *c != '[' && *c != ']').collect();
    if ACTIVITY_TOKENS.contains(&unbracketed.as_str()) {
        return UnitKind::InternationalActivity;
    }
    if VOLUME_TOKENS.contains(&numerator) && VOLUME_TOKENS.contains(&denominator) {
        return UnitKind::VolumeRatio;
    }
    UnitKind::Other
}

// Conversion Knowledge Base
//
// Static reference tables for the resolver: clinically validated special
// formulas, molecular weights, assay activity factors, and the
// simple-math equivalences the standards layer cannot express. Pure
// data plus lookup; no conversion logic lives here.
//
// All tables are keyed by normalized biomarker name or normalized unit
// code. Name matching is deliberately tolerant: the query matches an
// entry when either string equals, contains, or is contained by the
// other (case-insensitively), so "Vitamin D (25-OH)" still finds the
// "vitamin d" entries.

use crate::units::normalize::{normalize, normalize_name};

// =============================================================================
// Special Formulas
// =============================================================================

/// A directional, biomarker-specific empirical conversion. Takes
/// precedence over every generic strategy: these encode clinically
/// validated relationships (IFCC/NGSP HbA1c, analyte-specific factors)
/// that dimensional math would get wrong.
#[derive(Clone, Copy)]
pub struct SpecialFormula {
    /// Normalized analyte name fragment
    pub analyte: &'static str,
    /// Normalized source unit
    pub from: &'static str,
    /// Normalized target unit
    pub to: &'static str,
    pub transform: fn(f64) -> f64,
    /// Where the relationship comes from
    pub provenance: &'static str,
}

impl SpecialFormula {
    const fn new(
        analyte: &'static str,
        from: &'static str,
        to: &'static str,
        transform: fn(f64) -> f64,
        provenance: &'static str,
    ) -> Self {
        SpecialFormula {
            analyte,
            from,
            to,
            transform,
            provenance,
        }
    }
}

pub static SPECIAL_FORMULAS: &[SpecialFormula] = &[
    SpecialFormula::new(
        "glucose",
        "mmol/l",
        "mg/dl",
        |v| v * 18.0182,
        "MW 180.18 g/mol; ADA/WHO reporting factor",
    ),
    SpecialFormula::new(
        "glucose",
        "mg/dl",
        "mmol/l",
        |v| v / 18.0182,
        "MW 180.18 g/mol; ADA/WHO reporting factor",
    ),
    SpecialFormula::new(
        "hba1c",
        "%",
        "mmol/mol",
        |v| (v - 2.152) / 0.09148,
        "NGSP -> IFCC master equation",
    ),
    SpecialFormula::new(
        "hba1c",
        "mmol/mol",
        "%",
        |v| v * 0.09148 + 2.152,
        "IFCC -> NGSP master equation",
    ),
    SpecialFormula::new(
        "vitamin d",
        "ng/ml",
        "nmol/l",
        |v| v * 2.496,
        "25-OH-D, MW 400.6 g/mol",
    ),
    SpecialFormula::new(
        "vitamin d",
        "nmol/l",
        "ng/ml",
        |v| v / 2.496,
        "25-OH-D, MW 400.6 g/mol",
    ),
    SpecialFormula::new(
        "creatinine",
        "mg/dl",
        "umol/l",
        |v| v * 88.42,
        "MW 113.12 g/mol; KDIGO reporting factor",
    ),
    SpecialFormula::new(
        "creatinine",
        "umol/l",
        "mg/dl",
        |v| v / 88.42,
        "MW 113.12 g/mol; KDIGO reporting factor",
    ),
    SpecialFormula::new(
        "cholesterol",
        "mg/dl",
        "mmol/l",
        |v| v / 38.67,
        "MW 386.65 g/mol; NCEP factor",
    ),
    SpecialFormula::new(
        "cholesterol",
        "mmol/l",
        "mg/dl",
        |v| v * 38.67,
        "MW 386.65 g/mol; NCEP factor",
    ),
    SpecialFormula::new(
        "triglycerides",
        "mg/dl",
        "mmol/l",
        |v| v / 88.57,
        "mean TG MW 885.7 g/mol",
    ),
    SpecialFormula::new(
        "triglycerides",
        "mmol/l",
        "mg/dl",
        |v| v * 88.57,
        "mean TG MW 885.7 g/mol",
    ),
    SpecialFormula::new(
        "testosterone",
        "ng/dl",
        "nmol/l",
        |v| v / 28.85,
        "MW 288.4 g/mol",
    ),
    SpecialFormula::new(
        "testosterone",
        "nmol/l",
        "ng/dl",
        |v| v * 28.85,
        "MW 288.4 g/mol",
    ),
    SpecialFormula::new(
        "bilirubin",
        "mg/dl",
        "umol/l",
        |v| v * 17.104,
        "MW 584.66 g/mol",
    ),
    SpecialFormula::new(
        "bilirubin",
        "umol/l",
        "mg/dl",
        |v| v / 17.104,
        "MW 584.66 g/mol",
    ),
    SpecialFormula::new(
        "insulin",
        "uiu/ml",
        "pmol/l",
        |v| v * 6.00,
        "WHO IRP 66/304 assay calibration",
    ),
    SpecialFormula::new(
        "insulin",
        "pmol/l",
        "uiu/ml",
        |v| v / 6.00,
        "WHO IRP 66/304 assay calibration",
    ),
];

/// Directional lookup for a formula matching (biomarker, from, to).
pub fn find_special_formula(
    biomarker_name: &str,
    from: &str,
    to: &str,
) -> Option<&'static SpecialFormula> {
    let name = normalize_name(biomarker_name);
    if name.is_empty() {
        return None;
    }
    let from = normalize(from);
    let to = normalize(to);
    SPECIAL_FORMULAS
        .iter()
        .find(|f| names_match(&name, f.analyte) && f.from == from && f.to == to)
}

/// Tolerant analyte-name match: equal, contains, or contained-by.
fn names_match(query: &str, entry: &str) -> bool {
    query == entry || query.contains(entry) || entry.contains(query)
}

// =============================================================================
// Molecular Weights
// =============================================================================

/// Molar masses in g/mol (numerically mg/mmol), keyed by normalized
/// analyte name. Drives mass <-> molar concentration conversion for
/// biomarkers without a registered special formula.
pub static MOLECULAR_WEIGHTS: &[(&str, f64)] = &[
    ("glucose", 180.156),
    ("creatinine", 113.12),
    ("urea", 60.06),
    ("uric acid", 168.11),
    ("cholesterol", 386.65),
    ("triglycerides", 885.0),
    ("testosterone", 288.42),
    ("estradiol", 272.38),
    ("progesterone", 314.46),
    ("cortisol", 362.46),
    ("vitamin d", 400.64),
    ("vitamin b12", 1355.37),
    ("folate", 441.40),
    ("iron", 55.845),
    ("calcium", 40.078),
    ("magnesium", 24.305),
    ("phosphate", 94.97),
    ("bilirubin", 584.66),
    ("homocysteine", 135.18),
];

pub fn molecular_weight_for(biomarker_name: &str) -> Option<f64> {
    let name = normalize_name(biomarker_name);
    if name.is_empty() {
        return None;
    }
    // Exact key first, then tolerant match
    MOLECULAR_WEIGHTS
        .iter()
        .find(|(k, _)| *k == name)
        .or_else(|| MOLECULAR_WEIGHTS.iter().find(|(k, _)| names_match(&name, k)))
        .map(|(_, mw)| *mw)
}

// =============================================================================
// Activity Conversion Factors
// =============================================================================

/// Assay-typical factors relating mass and international-activity
/// measures, expressed as milli-IU per microgram. There is no universal
/// constant here: activity units are calibration-dependent, so a
/// per-biomarker override always wins over these defaults.
pub static CONVERSION_FACTORS: &[(&str, f64)] = &[
    ("insulin", 28.8),
    ("growth hormone", 3.0),
    ("prolactin", 21.2),
];

pub fn conversion_factor_for(biomarker_name: &str) -> Option<f64> {
    let name = normalize_name(biomarker_name);
    if name.is_empty() {
        return None;
    }
    CONVERSION_FACTORS
        .iter()
        .find(|(k, _)| *k == name)
        .or_else(|| CONVERSION_FACTORS.iter().find(|(k, _)| names_match(&name, k)))
        .map(|(_, f)| *f)
}

// =============================================================================
// Simple-Math Equivalences
// =============================================================================

/// Known unit equivalences the standards layer does not model as
/// interconvertible. Bidirectional: (a, b, factor) means value_in_b =
/// value_in_a * factor. Bracketed IU spellings are folded to bare `iu`
/// before lookup.
///
/// The mEq/L = mmol/L rule is valid only for monovalent ions; it is
/// applied unconditionally by unit pattern regardless of the electrolyte
/// involved, preserving long-observed behavior. Multivalent ions
/// (calcium, magnesium) are off by their valence under this rule.
pub static SIMPLE_EQUIVALENCES: &[(&str, &str, f64)] = &[
    ("miu/ml", "iu/l", 1.0),
    ("uiu/ml", "miu/l", 1.0),
    ("meq/l", "mmol/l", 1.0),
    ("ng/ml", "ug/l", 1.0),
    ("ug/ml", "mg/l", 1.0),
    ("pg/ml", "ng/l", 1.0),
];

/// Factor for a simple-math pair, either direction. Operates on
/// normalized codes with `[iu]` folded to `iu`.
pub fn simple_math_factor(from: &str, to: &str) -> Option<f64> {
    let from = fold_iu_brackets(&normalize(from));
    let to = fold_iu_brackets(&normalize(to));
    for (a, b, factor) in SIMPLE_EQUIVALENCES {
        if from == *a && to == *b {
            return Some(*factor);
        }
        if from == *b && to == *a {
            return Some(1.0 / *factor);
        }
    }
    None
}

fn fold_iu_brackets(unit: &str) -> String {
    unit.replace("[iu]", "iu")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_formula_directional() {
        let f = find_special_formula("Glucose", "mmol/L", "mg/dL").unwrap();
        assert!(((f.transform)(5.5) - 99.1).abs() < 0.01);

        // Reverse direction is its own entry
        let r = find_special_formula("Glucose", "mg/dL", "mmol/L").unwrap();
        assert!(((r.transform)(99.1) - 5.5).abs() < 0.001);

        // No formula for an unrelated pair
        assert!(find_special_formula("Glucose", "mmol/L", "nmol/L").is_none());
    }

    #[test]
    fn test_special_formula_tolerant_name() {
        // Query contains the entry analyte
        assert!(find_special_formula("Vitamin D (25-OH)", "ng/mL", "nmol/L").is_some());
        // Entry contains the query
        assert!(find_special_formula("vitamin", "ng/mL", "nmol/L").is_some());
        assert!(find_special_formula("Ferritin", "ng/mL", "nmol/L").is_none());
    }

    #[test]
    fn test_hba1c_formula_nonlinear() {
        let to_ifcc = find_special_formula("HbA1c", "%", "mmol/mol").unwrap();
        // NGSP 6.5% is IFCC ~48 mmol/mol
        assert!(((to_ifcc.transform)(6.5) - 47.53).abs() < 0.1);
    }

    #[test]
    fn test_molecular_weight_lookup() {
        assert_eq!(molecular_weight_for("glucose"), Some(180.156));
        assert_eq!(molecular_weight_for("Total Cholesterol"), Some(386.65));
        assert_eq!(molecular_weight_for("UnknownBiomarker"), None);
        assert_eq!(molecular_weight_for(""), None);
    }

    #[test]
    fn test_conversion_factor_lookup() {
        assert_eq!(conversion_factor_for("Insulin"), Some(28.8));
        assert_eq!(conversion_factor_for("Ferritin"), None);
    }

    #[test]
    fn test_simple_math_bidirectional() {
        assert_eq!(simple_math_factor("mIU/mL", "[IU]/L"), Some(1.0));
        assert_eq!(simple_math_factor("[IU]/L", "mIU/mL"), Some(1.0));
        assert_eq!(simple_math_factor("mEq/L", "mmol/L"), Some(1.0));
        assert_eq!(simple_math_factor("ng/mL", "ug/L"), Some(1.0));
        assert_eq!(simple_math_factor("mg/dL", "mmol/L"), None);
    }
}

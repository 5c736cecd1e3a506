// Conversion Resolver
//
// The core algorithm: given a value, a source unit, a target unit, and
// optional per-biomarker hints, pick a resolution strategy and return a
// typed result or a typed failure.
//
// Strategies are evaluated strictly in the order of the STRATEGIES
// slice. The order is a design invariant, not an optimization: identity
// before everything (identical units never spuriously fail), clinical
// special formulas before generic math (they encode relationships
// dimensional algebra gets wrong, e.g. HbA1c IFCC vs NGSP), structural
// stoichiometry/assay families before the standards layer, simple-math
// equivalences last before giving up.
//
// Resolution depends only on the arguments. No caches, no clocks, no
// global counters: two identical calls return identical results, which
// the merge preview relies on while a user is reviewing it.

use super::{ConversionConfig, ConversionMethod, ConversionResult};
use crate::knowledge;
use crate::units::classify::{classify, UnitKind};
use crate::units::normalize::normalize;
use crate::units::ucum::ucum_factor;

/// A strategy inspects the arguments and either produces a definitive
/// outcome (success *or* failure) or abstains with `None`, passing the
/// attempt to the next entry.
type Strategy = fn(f64, &str, &str, &ConversionConfig) -> Option<ConversionResult>;

/// Ordered strategy list; swapping entries changes observable output.
pub(crate) const STRATEGIES: &[(&str, Strategy)] = &[
    ("identity", identity),
    ("special-formula", special_formula),
    ("structural", structural),
    ("simple-math", simple_math),
];

/// Resolve a conversion. Never panics and never returns an `Err`:
/// failure is a `ConversionResult` with `method: Failed`.
pub fn resolve(value: f64, from: &str, to: &str, config: &ConversionConfig) -> ConversionResult {
    if !value.is_finite() {
        return ConversionResult::failed("Value is not a finite number");
    }

    for (_, strategy) in STRATEGIES {
        if let Some(result) = strategy(value, from, to, config) {
            return result;
        }
    }

    ConversionResult::failed(format!("Cannot convert between '{}' and '{}'", from, to))
}

/// Resolve without biomarker hints.
pub fn resolve_plain(value: f64, from: &str, to: &str) -> ConversionResult {
    resolve(value, from, to, &ConversionConfig::default())
}

// =============================================================================
// Strategies
// =============================================================================

fn identity(value: f64, from: &str, to: &str, _: &ConversionConfig) -> Option<ConversionResult> {
    if normalize(from) == normalize(to) {
        Some(ConversionResult::ok(value, ConversionMethod::Ucum))
    } else {
        None
    }
}

fn special_formula(
    value: f64,
    from: &str,
    to: &str,
    config: &ConversionConfig,
) -> Option<ConversionResult> {
    let name = config.biomarker_name.as_deref()?;
    let formula = knowledge::find_special_formula(name, from, to)?;
    Some(ConversionResult::ok(
        (formula.transform)(value),
        ConversionMethod::SpecialFormula,
    ))
}

/// Structural families by unit-kind pair: mass<->molar needs a molar
/// mass, mass<->activity needs an assay factor; everything else goes to
/// the UCUM standards converter. A family that applies but cannot
/// resolve its required datum fails *definitively* here; an abstention
/// only happens when no family applies and UCUM has no answer.
fn structural(
    value: f64,
    from: &str,
    to: &str,
    config: &ConversionConfig,
) -> Option<ConversionResult> {
    // Opaque assay labels convert to nothing but themselves, and
    // identity already ran.
    if normalize(from).contains('{') || normalize(to).contains('{') {
        return Some(ConversionResult::failed(format!(
            "Cannot convert between '{}' and '{}'",
            from, to
        )));
    }

    let kind_from = classify(from);
    let kind_to = classify(to);

    match (kind_from, kind_to) {
        (UnitKind::Mass, UnitKind::Molar) | (UnitKind::Molar, UnitKind::Mass) => {
            mass_molar(value, from, to, kind_from, config)
        }
        (UnitKind::Mass, UnitKind::InternationalActivity)
        | (UnitKind::InternationalActivity, UnitKind::Mass) => {
            mass_activity(value, from, to, kind_from, config)
        }
        _ => ucum_factor(from, to)
            .map(|factor| ConversionResult::ok(value * factor, ConversionMethod::Ucum)),
    }
}

fn simple_math(value: f64, from: &str, to: &str, _: &ConversionConfig) -> Option<ConversionResult> {
    knowledge::simple_math_factor(from, to)
        .map(|factor| ConversionResult::ok(value * factor, ConversionMethod::SimpleMath))
}

// =============================================================================
// Mass <-> Molar
// =============================================================================

fn mass_molar(
    value: f64,
    from: &str,
    to: &str,
    kind_from: UnitKind,
    config: &ConversionConfig,
) -> Option<ConversionResult> {
    // Token scales are fixed by classification; only an exotic
    // denominator defeats extraction, and then we abstain so the
    // standards layer or the fallback table can have a look.
    let (from_num, from_vol) = concentration_tokens(from)?;
    let (to_num, to_vol) = concentration_tokens(to)?;
    let (mass_scale, molar_scale) = if kind_from == UnitKind::Mass {
        (mass_scale_mg(&from_num)?, molar_scale_mmol(&to_num)?)
    } else {
        (mass_scale_mg(&to_num)?, molar_scale_mmol(&from_num)?)
    };

    let mw = match resolve_molecular_weight(config) {
        Ok(mw) => mw,
        Err(error) => return Some(ConversionResult::failed(error)),
    };

    let converted = if kind_from == UnitKind::Mass {
        let mg_per_l = value * mass_scale / from_vol;
        (mg_per_l / mw) * to_vol / molar_scale
    } else {
        let mmol_per_l = value * molar_scale / from_vol;
        (mmol_per_l * mw) * to_vol / mass_scale
    };
    Some(ConversionResult::ok(
        converted,
        ConversionMethod::MolecularWeight,
    ))
}

/// The molar mass, or the Failed-path error text when unresolvable.
fn resolve_molecular_weight(config: &ConversionConfig) -> Result<f64, String> {
    if let Some(mw) = config.molecular_weight {
        if mw > 0.0 {
            return Ok(mw);
        }
    }
    if let Some(name) = config.biomarker_name.as_deref() {
        if let Some(mw) = knowledge::molecular_weight_for(name) {
            return Ok(mw);
        }
        return Err(format!(
            "Molecular weight for '{}' is not known; cannot convert between mass and molar units",
            name
        ));
    }
    Err("Molecular weight is required to convert between mass and molar units".to_string())
}

// =============================================================================
// Mass <-> International Activity
// =============================================================================

fn mass_activity(
    value: f64,
    from: &str,
    to: &str,
    kind_from: UnitKind,
    config: &ConversionConfig,
) -> Option<ConversionResult> {
    let (from_num, from_vol) = concentration_tokens(from)?;
    let (to_num, to_vol) = concentration_tokens(to)?;

    let (mass_scale, iu_scale) = if kind_from == UnitKind::Mass {
        (mass_scale_ug(&from_num)?, activity_scale_miu(&to_num)?)
    } else {
        (mass_scale_ug(&to_num)?, activity_scale_miu(&from_num)?)
    };

    let factor = match resolve_activity_factor(config) {
        Ok(factor) => factor,
        Err(error) => return Some(ConversionResult::failed(error)),
    };

    let converted = if kind_from == UnitKind::Mass {
        let ug_per_l = value * mass_scale / from_vol;
        (ug_per_l * factor) * to_vol / iu_scale
    } else {
        let miu_per_l = value * iu_scale / from_vol;
        (miu_per_l / factor) * to_vol / mass_scale
    };
    Some(ConversionResult::ok(
        converted,
        ConversionMethod::ConversionFactor,
    ))
}

/// The assay factor, or the Failed-path error text when unresolvable.
fn resolve_activity_factor(config: &ConversionConfig) -> Result<f64, String> {
    if let Some(factor) = config.conversion_factor {
        if factor > 0.0 {
            return Ok(factor);
        }
    }
    if let Some(name) = config.biomarker_name.as_deref() {
        if let Some(factor) = knowledge::conversion_factor_for(name) {
            return Ok(factor);
        }
        return Err(format!(
            "Conversion factor for '{}' is not known; cannot convert between mass and activity units",
            name
        ));
    }
    Err("Conversion factor is required to convert between mass and activity units".to_string())
}

// =============================================================================
// Basis Scales
// =============================================================================

/// (numerator token, denominator volume scale to litres). A missing
/// denominator is scale 1; an unknown denominator abstains.
fn concentration_tokens(unit: &str) -> Option<(String, f64)> {
    let n = normalize(unit);
    let mut parts = n.splitn(2, '/');
    let numerator = parts.next().unwrap_or("").to_string();
    let vol = match parts.next() {
        None => 1.0,
        Some(d) => volume_scale_l(d)?,
    };
    Some((numerator, vol))
}

fn volume_scale_l(token: &str) -> Option<f64> {
    match token {
        "l" => Some(1.0),
        "dl" => Some(0.1),
        "ml" => Some(1e-3),
        "ul" => Some(1e-6),
        _ => None,
    }
}

/// Mass scale relative to milligrams.
fn mass_scale_mg(token: &str) -> Option<f64> {
    match token {
        "kg" => Some(1e6),
        "g" => Some(1e3),
        "mg" => Some(1.0),
        "ug" => Some(1e-3),
        "ng" => Some(1e-6),
        "pg" => Some(1e-9),
        _ => None,
    }
}

/// Mass scale relative to micrograms (activity basis).
fn mass_scale_ug(token: &str) -> Option<f64> {
    mass_scale_mg(token).map(|s| s * 1e3)
}

/// Molar scale relative to millimoles.
fn molar_scale_mmol(token: &str) -> Option<f64> {
    match token {
        "mol" => Some(1e3),
        "mmol" => Some(1.0),
        "umol" => Some(1e-3),
        "nmol" => Some(1e-6),
        "pmol" => Some(1e-9),
        _ => None,
    }
}

/// Activity scale relative to milli-IU; brackets already folded out.
fn activity_scale_miu(token: &str) -> Option<f64> {
    let folded: String = token.chars().filter(|c| *c != '[' && *c != ']').collect();
    match folded.as_str() {
        "kiu" => Some(1e6),
        "iu" => Some(1e3),
        "miu" => Some(1.0),
        "uiu" => Some(1e-3),
        "niu" => Some(1e-6),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

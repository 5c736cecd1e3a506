// Resolver Integration Tests
//
// End-to-end checks of the conversion resolver against its contract:
// identity, determinism, method precedence, round-trip tolerance, and
// the failure invariant, plus the canonical clinical scenarios.

use biounits::{resolve, resolve_plain, ConversionConfig, ConversionMethod};

// =============================================================================
// Helpers
// =============================================================================

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected ~{}, got {}",
        expected,
        actual
    );
}

// =============================================================================
// Canonical Scenarios
// =============================================================================

#[test]
fn scenario_identity_is_a_noop_ucum_conversion() {
    let r = resolve_plain(100.0, "mg/dL", "mg/dL");
    assert_eq!(r.method, ConversionMethod::Ucum);
    assert_eq!(r.value, 100.0);
    assert!(r.error.is_none());
}

#[test]
fn scenario_glucose_special_formula() {
    let r = resolve(5.5, "mmol/L", "mg/dL", &ConversionConfig::named("Glucose"));
    assert_eq!(r.method, ConversionMethod::SpecialFormula);
    assert_close(r.value, 99.1, 0.05);
}

#[test]
fn scenario_unknown_biomarker_missing_molecular_weight() {
    let r = resolve(
        10.0,
        "mg/dL",
        "mmol/L",
        &ConversionConfig::named("UnknownBiomarker"),
    );
    assert_eq!(r.method, ConversionMethod::Failed);
    assert!(r.value.is_nan());
    assert!(r.error.as_deref().unwrap().contains("Molecular weight"));
}

#[test]
fn scenario_testosterone_assay_factor() {
    let config = ConversionConfig::named("Testosterone").with_conversion_factor(0.0347);
    let r = resolve(5.0, "ng/mL", "mIU/L", &config);
    assert_eq!(r.method, ConversionMethod::ConversionFactor);
    assert_close(r.value, 0.1735, 1e-6);
}

// =============================================================================
// Contract Properties
// =============================================================================

#[test]
fn property_identity_for_arbitrary_units() {
    for (value, unit) in [
        (0.0, "mg/dL"),
        (-3.5, "mmol/L"),
        (42.0, "{titer}"),
        (7.25, "%"),
        (1e6, "[IU]/L"),
    ] {
        let r = resolve_plain(value, unit, unit);
        assert_eq!(r.method, ConversionMethod::Ucum, "unit {}", unit);
        assert_eq!(r.value, value);
    }
}

#[test]
fn property_determinism_across_repeated_calls() {
    let config = ConversionConfig::named("Urea");
    let first = resolve(30.0, "mg/dL", "mmol/L", &config);
    for _ in 0..10 {
        let again = resolve(30.0, "mg/dL", "mmol/L", &config);
        assert_eq!(again, first);
    }
}

#[test]
fn property_special_formula_preempts_generic_strategies() {
    // Glucose mg/dL <-> mmol/L has a formula, a knowledge-base molar
    // mass, and is a mass/molar kind pair: the formula must win.
    let r = resolve(99.1, "mg/dL", "mmol/L", &ConversionConfig::named("Glucose"));
    assert_eq!(r.method, ConversionMethod::SpecialFormula);

    // HbA1c % <-> mmol/mol is nonlinear; anything generic would be wrong
    let r = resolve(6.5, "%", "mmol/mol", &ConversionConfig::named("HbA1c"));
    assert_eq!(r.method, ConversionMethod::SpecialFormula);
    assert_close(r.value, 47.5, 0.1);
}

#[test]
fn property_round_trip_within_tolerance() {
    // Formula pair
    let config = ConversionConfig::named("Glucose");
    let fwd = resolve(5.5, "mmol/L", "mg/dL", &config);
    let back = resolve(fwd.value, "mg/dL", "mmol/L", &config);
    assert!((back.value - 5.5).abs() / 5.5 < 1e-3);

    // HbA1c linear master equation and its inverse
    let config = ConversionConfig::named("HbA1c");
    let fwd = resolve(6.5, "%", "mmol/mol", &config);
    let back = resolve(fwd.value, "mmol/mol", "%", &config);
    assert!((back.value - 6.5).abs() / 6.5 < 1e-6);

    // Molecular-weight path
    let config = ConversionConfig::named("Cortisol");
    let fwd = resolve(12.0, "ug/dL", "nmol/L", &config);
    assert_eq!(fwd.method, ConversionMethod::MolecularWeight);
    let back = resolve(fwd.value, "nmol/L", "ug/dL", &config);
    assert!((back.value - 12.0).abs() / 12.0 < 1e-9);
}

#[test]
fn property_failure_invariant() {
    let failures = [
        resolve_plain(1.0, "mg/dL", "{positive}"),
        resolve_plain(1.0, "%", "mmol/L"),
        resolve(1.0, "mg/dL", "mmol/L", &ConversionConfig::default()),
        resolve(1.0, "ng/mL", "mIU/L", &ConversionConfig::named("Ferritin")),
        resolve_plain(f64::NAN, "mg/dL", "g/L"),
    ];
    for r in failures {
        assert_eq!(r.method, ConversionMethod::Failed);
        assert!(r.value.is_nan());
        assert!(!r.error.as_deref().unwrap_or("").is_empty());
    }

    let successes = [
        resolve_plain(10.0, "mg/dL", "g/L"),
        resolve_plain(10.0, "mEq/L", "mmol/L"),
        resolve(1.0, "ug/L", "mIU/L", &ConversionConfig::named("Insulin")),
    ];
    for r in successes {
        assert_ne!(r.method, ConversionMethod::Failed);
        assert!(r.value.is_finite());
        assert!(r.error.is_none());
    }
}

// =============================================================================
// Strategy Coverage
// =============================================================================

#[test]
fn ucum_handles_prefix_changes_within_a_kind() {
    let r = resolve_plain(1.0, "g/L", "mg/dL");
    assert_eq!(r.method, ConversionMethod::Ucum);
    assert_close(r.value, 100.0, 1e-9);

    let r = resolve_plain(0.35, "mmol/L", "nmol/mL");
    assert_eq!(r.method, ConversionMethod::Ucum);
    assert_close(r.value, 350.0, 1e-9);
}

#[test]
fn simple_math_covers_what_the_standards_layer_refuses() {
    // Activity spelling aliases are not UCUM-convertible by design
    let r = resolve_plain(3.2, "mIU/mL", "[IU]/L");
    assert_eq!(r.method, ConversionMethod::SimpleMath);
    assert_eq!(r.value, 3.2);

    // Equivalents-to-millimoles, applied unconditionally by pattern
    let r = resolve_plain(4.5, "mmol/L", "mEq/L");
    assert_eq!(r.method, ConversionMethod::SimpleMath);
    assert_eq!(r.value, 4.5);
}

#[test]
fn overrides_beat_knowledge_base_values() {
    // Insulin has a knowledge-base factor of 28.8; the caller's wins
    let config = ConversionConfig::named("Insulin").with_conversion_factor(26.0);
    let r = resolve(1.0, "ug/L", "mIU/L", &config);
    assert_close(r.value, 26.0, 1e-9);
}

// Merge Flow Integration Tests
//
// The full consolidation path: preview construction and its invariants
// (completeness, single target, blocked exclusion), execution
// write-sets, and the curated-registry ledger round trip.

use biounits::merge::{registry::seed_blocked_merges, set_selected};
use biounits::{
    build_preview, execute, BiomarkerConfig, BiomarkerRecord, BlockedMerge, ConversionLedger,
    ConversionMethod, MergeError, VerifiedConversion,
};
use chrono::Utc;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn create_test_ledger() -> (TempDir, ConversionLedger) {
    let temp_dir = TempDir::new().unwrap();
    let ledger = ConversionLedger::new(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, ledger)
}

/// Two Vitamin D configs: ng/mL with 3 records, nmol/L with 2.
fn vitamin_d_fixture() -> (Vec<BiomarkerConfig>, Vec<BiomarkerRecord>) {
    let ng = BiomarkerConfig::new("Vitamin D", "ng/mL");
    let nmol = BiomarkerConfig::new("Vitamin D", "nmol/L");
    let records = vec![
        BiomarkerRecord::numeric(&ng, 28.0),
        BiomarkerRecord::numeric(&ng, 31.5),
        BiomarkerRecord::numeric(&ng, 29.9),
        BiomarkerRecord::numeric(&nmol, 74.9),
        BiomarkerRecord::numeric(&nmol, 62.4),
    ];
    (vec![ng, nmol], records)
}

// =============================================================================
// Preview Scenarios
// =============================================================================

#[test]
fn scenario_vitamin_d_preview() {
    let (configs, records) = vitamin_d_fixture();
    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &[], &[]);

    // Every record appears exactly once with a definite outcome
    assert_eq!(preview.records.len(), 5);
    assert!(!preview.has_errors);

    // The ng/mL config is the single target
    let targets: Vec<_> = preview.configs.iter().filter(|c| c.is_target).collect();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].config.ucum_code, "ng/mL");
    assert!(targets[0].selected);

    // nmol/L records convert through the clinical formula
    for info in preview
        .records
        .iter()
        .filter(|i| i.original_unit == "nmol/L")
    {
        assert_eq!(info.result.method, ConversionMethod::SpecialFormula);
        assert!(info.converted_value.is_some());
    }

    // Unit tallies drive the target suggestion
    assert_eq!(preview.unit_stats.len(), 2);
    assert_eq!(preview.unit_stats[0].unit, "ng/mL");
    assert_eq!(preview.unit_stats[0].records_count, 3);
    assert_eq!(
        biounits::suggest_target_unit(&preview.unit_stats),
        Some("ng/mL")
    );
}

#[test]
fn scenario_vitamin_d_execution() {
    let (configs, records) = vitamin_d_fixture();
    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &[], &[]);
    let execution = execute(&preview).unwrap();

    assert_eq!(execution.summary.records_merged, 2);
    assert_eq!(execution.summary.configs_deleted, 1);

    // Exactly one verified conversion, keyed by the normalized triple
    assert_eq!(execution.verified.len(), 1);
    assert_eq!(
        execution.verified[0].key(),
        (
            "vitamin d".to_string(),
            "nmol/l".to_string(),
            "ng/ml".to_string()
        )
    );
}

#[test]
fn preview_completeness_includes_failures() {
    let ng = BiomarkerConfig::new("Ferritin", "ng/mL");
    let iu = BiomarkerConfig::new("Ferritin", "mIU/L");
    let records = vec![
        BiomarkerRecord::numeric(&ng, 40.0),
        BiomarkerRecord::numeric(&iu, 12.0), // no assay factor known
        BiomarkerRecord::textual(&ng, "pending"), // no numeric value
    ];
    let preview = build_preview(
        "Ferritin",
        &[ng, iu],
        &records,
        "ng/mL",
        &[],
        &[],
    );

    assert_eq!(preview.records.len(), 3);
    assert!(preview.has_errors);
    assert_eq!(preview.failed_conversions.len(), 2);

    let errors: Vec<&str> = preview
        .failed_conversions
        .iter()
        .map(|f| f.error.as_str())
        .collect();
    assert!(errors.iter().any(|e| e.contains("Conversion factor")));
    assert!(errors.iter().any(|e| *e == "Record value is not defined"));
}

#[test]
fn preview_accepts_foreign_target_unit() {
    // A target unit not present among the configs is safe: no target
    // entry, and execution refuses the resulting preview
    let (configs, records) = vitamin_d_fixture();
    let preview = build_preview("Vitamin D", &configs, &records, "umol/L", &[], &[]);
    assert!(preview.configs.iter().all(|c| !c.is_target));
    assert!(matches!(execute(&preview), Err(MergeError::MissingTarget)));
}

#[test]
fn blocked_merge_excludes_source_configs() {
    let gdl = BiomarkerConfig::new("Albumin", "g/dL");
    let pct = BiomarkerConfig::new("Albumin", "%");
    let records = vec![
        BiomarkerRecord::numeric(&gdl, 4.2),
        BiomarkerRecord::numeric(&pct, 55.0),
    ];

    // Without the block, the % config would participate (and fail)
    let open = build_preview("Albumin", &[gdl.clone(), pct.clone()], &records, "g/dL", &[], &[]);
    assert_eq!(open.configs.len(), 2);

    // With the seed block it is silently excluded, records and all
    let blocked = seed_blocked_merges();
    let preview = build_preview(
        "Albumin",
        &[gdl, pct],
        &records,
        "g/dL",
        &[],
        &blocked,
    );
    assert_eq!(preview.configs.len(), 1);
    assert!(preview.configs[0].is_target);
    assert_eq!(preview.records.len(), 1);
    assert!(!preview.has_errors);
}

#[test]
fn verified_flag_reflects_registry() {
    let (configs, records) = vitamin_d_fixture();
    let verified = vec![VerifiedConversion {
        biomarker_name: "vitamin d".to_string(),
        source_unit: "nmol/L".to_string(),
        target_unit: "ng/mL".to_string(),
        conversion_method: ConversionMethod::SpecialFormula,
        molecular_weight: None,
        conversion_factor: None,
        created_at: Utc::now(),
    }];

    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &verified, &[]);
    let source = preview
        .configs
        .iter()
        .find(|c| !c.is_target)
        .unwrap();
    assert!(source.verified);

    // First-seen pair without the registry entry is unverified
    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &[], &[]);
    let source = preview.configs.iter().find(|c| !c.is_target).unwrap();
    assert!(!source.verified);
}

#[test]
fn deselection_yields_partial_merge() {
    let (configs, records) = vitamin_d_fixture();
    let source_id = configs[1].id;
    let mut preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &[], &[]);
    set_selected(&mut preview, source_id, false);

    let execution = execute(&preview).unwrap();
    assert_eq!(execution.summary.records_merged, 0);
    assert_eq!(execution.summary.configs_deleted, 0);
}

// =============================================================================
// Ledger Round Trip
// =============================================================================

#[test]
fn ledger_round_trip_and_uniqueness() {
    let (_temp, ledger) = create_test_ledger();

    let (configs, records) = vitamin_d_fixture();
    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &[], &[]);
    let execution = execute(&preview).unwrap();

    // First persistence writes the conversion; replaying the same
    // execution writes nothing more
    assert_eq!(ledger.record_outcome(&execution).unwrap(), 1);
    assert_eq!(ledger.record_outcome(&execution).unwrap(), 0);

    let loaded = ledger.load_verified().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key(), execution.verified[0].key());
    assert_eq!(loaded[0].conversion_method, ConversionMethod::SpecialFormula);

    // A rebuilt preview now sees the pair as verified
    let preview = build_preview("Vitamin D", &configs, &records, "ng/mL", &loaded, &[]);
    assert!(preview.configs.iter().all(|c| c.verified));
}

#[test]
fn ledger_loads_seeded_and_user_blocks() {
    let (_temp, ledger) = create_test_ledger();

    let seeded = ledger.load_blocked().unwrap();
    assert_eq!(seeded.len(), seed_blocked_merges().len());

    ledger
        .log_blocked(&BlockedMerge {
            biomarker_name: "Cortisol".to_string(),
            source_units: vec!["ug/dL".to_string()],
            target_units: vec!["nmol/L".to_string()],
            created_at: Utc::now(),
        })
        .unwrap();

    let all = ledger.load_blocked().unwrap();
    assert_eq!(all.len(), seeded.len() + 1);
    assert!(all.iter().any(|b| b.blocks("cortisol", "ug/dL", "nmol/L")));
}

#[test]
fn ledger_tolerates_corrupt_lines() {
    let (_temp, ledger) = create_test_ledger();

    let conversion = VerifiedConversion {
        biomarker_name: "Glucose".to_string(),
        source_unit: "mmol/L".to_string(),
        target_unit: "mg/dL".to_string(),
        conversion_method: ConversionMethod::SpecialFormula,
        molecular_weight: None,
        conversion_factor: None,
        created_at: Utc::now(),
    };
    ledger.log_verified(&conversion).unwrap();

    // Corruption in the middle of the file loses one line, not the file
    let path = ledger.root().join("verified.jsonl");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("not json\n");
    std::fs::write(&path, contents).unwrap();

    let loaded = ledger.load_verified().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].biomarker_name, "Glucose");
}

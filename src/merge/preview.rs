// Merge Preview
//
// A MergePreview is a pure function of (configs, records, chosen target
// unit, curated registries) at a point in time. The UI recomputes it on
// every relevant input change and renders it read-only; nothing here is
// persisted. Building a preview twice from identical inputs yields a
// deep-equal value.

use serde::Serialize;

use super::registry::{BlockedMerge, VerifiedConversion};
use crate::convert::{resolve, ConversionConfig, ConversionMethod, ConversionResult};
use crate::model::{BiomarkerConfig, BiomarkerRecord, RecordId};
use crate::units::normalize::{is_opaque_label, normalize};

/// Per-unit record tally, used by the UI to suggest candidate targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStat {
    pub unit: String,
    pub records_count: usize,
}

/// One source (or target) configuration's role in the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigMergeInfo {
    pub config: BiomarkerConfig,
    pub records_count: usize,
    /// Exactly one entry per preview is the target when any config
    /// carries the target unit; the target is always selected.
    pub is_target: bool,
    pub selected: bool,
    /// Was this (biomarker, source unit, target unit) previously
    /// human-confirmed?
    pub verified: bool,
}

/// One record's planned outcome. Every participating record appears
/// exactly once, failed or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordConversionInfo {
    pub record: BiomarkerRecord,
    pub original_value: Option<f64>,
    pub original_unit: String,
    /// Present iff the conversion succeeded
    pub converted_value: Option<f64>,
    pub result: ConversionResult,
}

/// A failed record's details, grouped for user-facing display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedConversion {
    pub record_id: RecordId,
    pub original_unit: String,
    pub target_unit: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergePreview {
    pub biomarker_name: String,
    pub target_unit: String,
    pub configs: Vec<ConfigMergeInfo>,
    pub records: Vec<RecordConversionInfo>,
    pub unit_stats: Vec<UnitStat>,
    pub has_errors: bool,
    pub failed_conversions: Vec<FailedConversion>,
}

/// Build a merge plan for all configurations sharing a biomarker name.
///
/// Preconditions: `configs` share the same normalized name; `records`
/// are approved records belonging to one of `configs`. Any `target_unit`
/// string is safe, including one not present among the configs (the
/// preview then simply has no target entry).
///
/// Excluded from participation, together with their records: configs
/// under an opaque-label unit ({...} or the literal `1`), configs whose
/// (source unit, target unit) combination is blocked for this biomarker,
/// and configs with no records.
pub fn build_preview(
    biomarker_name: &str,
    configs: &[BiomarkerConfig],
    records: &[BiomarkerRecord],
    target_unit: &str,
    verified: &[VerifiedConversion],
    blocked: &[BlockedMerge],
) -> MergePreview {
    let target_norm = normalize(target_unit);

    // Participating configs, in input order
    let mut participants: Vec<&BiomarkerConfig> = Vec::new();
    for config in configs {
        if is_opaque_label(&config.ucum_code) {
            continue;
        }
        let unit_norm = normalize(&config.ucum_code);
        let records_count = records
            .iter()
            .filter(|r| r.config_id == config.id)
            .count();
        if records_count == 0 {
            continue;
        }
        let is_target_unit = unit_norm == target_norm;
        if !is_target_unit
            && blocked
                .iter()
                .any(|b| b.blocks(biomarker_name, &config.ucum_code, target_unit))
        {
            continue;
        }
        participants.push(config);
    }

    // Exactly one target among configs carrying the target unit: most
    // records wins, ties broken by id, so the choice is stable across
    // rebuilds.
    let target_id = participants
        .iter()
        .filter(|c| normalize(&c.ucum_code) == target_norm)
        .max_by_key(|c| {
            let count = records.iter().filter(|r| r.config_id == c.id).count();
            (count, std::cmp::Reverse(c.id))
        })
        .map(|c| c.id);

    // Unit tallies, grouped by normalized spelling, shown under the
    // first-seen raw spelling
    let mut unit_stats: Vec<UnitStat> = Vec::new();
    for config in &participants {
        let unit_norm = normalize(&config.ucum_code);
        let count = records.iter().filter(|r| r.config_id == config.id).count();
        match unit_stats
            .iter_mut()
            .find(|s| normalize(&s.unit) == unit_norm)
        {
            Some(stat) => stat.records_count += count,
            None => unit_stats.push(UnitStat {
                unit: config.ucum_code.clone(),
                records_count: count,
            }),
        }
    }
    unit_stats.sort_by(|a, b| {
        b.records_count
            .cmp(&a.records_count)
            .then_with(|| a.unit.cmp(&b.unit))
    });

    // Per-record outcomes, every participating record exactly once
    let mut record_infos: Vec<RecordConversionInfo> = Vec::new();
    let mut failed_conversions: Vec<FailedConversion> = Vec::new();
    for record in records {
        let Some(config) = participants.iter().find(|c| c.id == record.config_id) else {
            continue;
        };

        let result = match record.value {
            None => ConversionResult::failed("Record value is not defined"),
            Some(value) if !value.is_finite() => {
                ConversionResult::failed("Record value is not defined")
            }
            Some(value) => {
                if normalize(&config.ucum_code) == target_norm {
                    // No-op "conversion": the display layer may label it
                    // differently, but the plan treats it as converted
                    ConversionResult::ok(value, ConversionMethod::Ucum)
                } else {
                    let conversion_config = ConversionConfig {
                        biomarker_name: Some(config.name.clone()),
                        molecular_weight: config.molecular_weight,
                        conversion_factor: config.conversion_factor,
                    };
                    resolve(value, &config.ucum_code, target_unit, &conversion_config)
                }
            }
        };

        if result.is_failed() {
            failed_conversions.push(FailedConversion {
                record_id: record.id,
                original_unit: config.ucum_code.clone(),
                target_unit: target_unit.to_string(),
                error: result.error.clone().unwrap_or_default(),
            });
        }

        let converted_value = (!result.is_failed()).then_some(result.value);
        record_infos.push(RecordConversionInfo {
            record: record.clone(),
            original_value: record.value,
            original_unit: config.ucum_code.clone(),
            converted_value,
            result,
        });
    }

    // Config roles
    let config_infos: Vec<ConfigMergeInfo> = participants
        .iter()
        .map(|config| {
            let is_target = Some(config.id) == target_id;
            let records_count = records.iter().filter(|r| r.config_id == config.id).count();
            let is_verified = is_target
                || verified
                    .iter()
                    .any(|v| v.matches(biomarker_name, &config.ucum_code, target_unit));
            ConfigMergeInfo {
                config: (*config).clone(),
                records_count,
                is_target,
                selected: true,
                verified: is_verified,
            }
        })
        .collect();

    let has_errors = !failed_conversions.is_empty();
    MergePreview {
        biomarker_name: biomarker_name.to_string(),
        target_unit: target_unit.to_string(),
        configs: config_infos,
        records: record_infos,
        unit_stats,
        has_errors,
        failed_conversions,
    }
}

/// Most-records-wins target suggestion; ties break alphabetically. A UI
/// convenience on top of `build_preview`, which itself accepts any
/// caller-chosen target.
pub fn suggest_target_unit(unit_stats: &[UnitStat]) -> Option<&str> {
    unit_stats
        .iter()
        .max_by(|a, b| {
            a.records_count
                .cmp(&b.records_count)
                .then_with(|| b.unit.cmp(&a.unit))
        })
        .map(|s| s.unit.as_str())
}

/// Toggle a source config off (or back on) and return the rebuilt
/// selection state. The target cannot be deselected.
pub fn set_selected(preview: &mut MergePreview, config_id: crate::model::ConfigId, selected: bool) {
    for info in &mut preview.configs {
        if info.config.id == config_id && !info.is_target {
            info.selected = selected;
        }
    }
}

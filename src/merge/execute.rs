// Merge Execution
//
// Consumes exactly one user-approved MergePreview snapshot and produces
// the write-set for the persistence collaborator: rewritten records,
// config ids to delete, and freshly verified conversions. The engine
// itself writes nothing.
//
// All record rewrites are computed before any deletion is recorded. The
// collaborator must honor that ordering too: a crash after rewrites but
// before deletions leaves orphaned records pointing at a still-existing
// config (recoverable); the reverse ordering would leave records
// pointing at a deleted config.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use super::preview::MergePreview;
use super::registry::{conversion_key, ConversionLedger, VerifiedConversion};
use crate::model::{BiomarkerRecord, ConfigId};
use crate::units::normalize::normalize;

/// Fatal conditions. A preview without a selected target was built
/// incorrectly by the caller; everything else degrades to a no-op.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("merge preview has no selected target configuration")]
    MissingTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub records_merged: usize,
    pub configs_deleted: usize,
}

/// The write-set a collaborator persists as one logical transaction.
#[derive(Debug, Clone, Serialize)]
pub struct MergeExecution {
    /// Records re-pointed to the target config, values rewritten
    pub updated_records: Vec<BiomarkerRecord>,
    /// Fully absorbed source configs
    pub deleted_config_ids: Vec<ConfigId>,
    /// Newly confirmed conversions, one per distinct key triple
    pub verified: Vec<VerifiedConversion>,
    pub summary: MergeSummary,
}

/// Round a converted value for storage. Audit fields keep the unrounded
/// original.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn execute(preview: &MergePreview) -> Result<MergeExecution, MergeError> {
    let target = preview
        .configs
        .iter()
        .find(|c| c.is_target && c.selected)
        .ok_or(MergeError::MissingTarget)?;

    let target_norm = normalize(&preview.target_unit);
    let sources: Vec<_> = preview
        .configs
        .iter()
        .filter(|c| c.selected && !c.is_target)
        .collect();

    let mut updated_records: Vec<BiomarkerRecord> = Vec::new();
    let mut verified: Vec<VerifiedConversion> = Vec::new();
    let mut verified_keys: HashSet<(String, String, String)> = HashSet::new();
    let now = Utc::now();

    for source in &sources {
        let mut sample_method = None;

        for info in &preview.records {
            if info.record.config_id != source.config.id {
                continue;
            }
            let (Some(converted), false) = (info.converted_value, info.result.is_failed()) else {
                // Failed records stay untouched on their original config
                continue;
            };

            let mut updated = info.record.clone();
            updated.config_id = target.config.id;
            updated.original_value = info.original_value;
            updated.original_unit = Some(info.original_unit.clone());
            updated.value = Some(round2(converted));
            updated.ucum_code = preview.target_unit.clone();
            updated_records.push(updated);

            sample_method.get_or_insert(info.result.method);
        }

        // One verified conversion per distinct triple, taken from a
        // sample successful record's method
        if let Some(method) = sample_method {
            if normalize(&source.config.ucum_code) != target_norm {
                let key = conversion_key(
                    &preview.biomarker_name,
                    &source.config.ucum_code,
                    &preview.target_unit,
                );
                if verified_keys.insert(key) {
                    verified.push(VerifiedConversion {
                        biomarker_name: preview.biomarker_name.clone(),
                        source_unit: source.config.ucum_code.clone(),
                        target_unit: preview.target_unit.clone(),
                        conversion_method: method,
                        molecular_weight: source.config.molecular_weight,
                        conversion_factor: source.config.conversion_factor,
                        created_at: now,
                    });
                }
            }
        }
    }

    // Deletions come last, after every rewrite above is computed
    let deleted_config_ids: Vec<ConfigId> = sources.iter().map(|c| c.config.id).collect();

    let summary = MergeSummary {
        records_merged: updated_records.len(),
        configs_deleted: deleted_config_ids.len(),
    };
    Ok(MergeExecution {
        updated_records,
        deleted_config_ids,
        verified,
        summary,
    })
}

impl ConversionLedger {
    /// Persist an execution's newly confirmed conversions. Returns how
    /// many were actually written (duplicate key triples are skipped).
    pub fn record_outcome(&self, execution: &MergeExecution) -> anyhow::Result<usize> {
        let mut written = 0;
        for conversion in &execution.verified {
            if self.log_verified(conversion)? {
                written += 1;
            }
        }
        Ok(written)
    }
}

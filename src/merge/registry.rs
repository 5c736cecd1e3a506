// Curated Conversion Registries
//
// Two kinds of standing user decisions persist across sessions:
//
// - VerifiedConversion: "this (biomarker, source unit, target unit)
//   conversion was human-confirmed once; treat it as trusted next time."
// - BlockedMerge: "never suggest merging these unit combinations for
//   this biomarker again."
//
// Both are owned by the persistence collaborator and passed into the
// engine by value on every preview build; the engine holds no mutable
// state of its own. The ConversionLedger below is that collaborator:
// append-only JSONL files, read fresh on each use, tolerant of corrupt
// lines.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::convert::ConversionMethod;
use crate::units::normalize::{normalize, normalize_name};

/// A previously human-confirmed conversion for a biomarker/unit-pair
/// triple. At most one exists per normalized key triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedConversion {
    pub biomarker_name: String,
    pub source_unit: String,
    pub target_unit: String,
    /// Never `Failed`; the method that produced the confirmed values
    pub conversion_method: ConversionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl VerifiedConversion {
    /// Normalized uniqueness key.
    pub fn key(&self) -> (String, String, String) {
        conversion_key(&self.biomarker_name, &self.source_unit, &self.target_unit)
    }

    pub fn matches(&self, biomarker_name: &str, source_unit: &str, target_unit: &str) -> bool {
        self.key() == conversion_key(biomarker_name, source_unit, target_unit)
    }
}

/// Normalized (name, source, target) triple used to key verified
/// conversions and deduplicate within a merge execution.
pub fn conversion_key(
    biomarker_name: &str,
    source_unit: &str,
    target_unit: &str,
) -> (String, String, String) {
    (
        normalize_name(biomarker_name),
        normalize(source_unit),
        normalize(target_unit),
    )
}

/// A standing refusal: these source units must never again be suggested
/// for merging into these target units under this biomarker name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedMerge {
    pub biomarker_name: String,
    pub source_units: Vec<String>,
    pub target_units: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl BlockedMerge {
    /// Does this entry block merging `source_unit` into `target_unit`
    /// for the given biomarker name?
    pub fn blocks(&self, biomarker_name: &str, source_unit: &str, target_unit: &str) -> bool {
        normalize_name(&self.biomarker_name) == normalize_name(biomarker_name)
            && self
                .source_units
                .iter()
                .any(|u| normalize(u) == normalize(source_unit))
            && self
                .target_units
                .iter()
                .any(|u| normalize(u) == normalize(target_unit))
    }
}

/// Read-only default blocks shipped with the engine. These are unit
/// combinations that look mergeable by name but are clinically distinct
/// measurements.
pub fn seed_blocked_merges() -> Vec<BlockedMerge> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    vec![
        // BSA-normalized GFR is not a unit conversion away from raw
        // clearance.
        BlockedMerge {
            biomarker_name: "egfr".to_string(),
            source_units: vec!["mL/min".to_string(), "mL/min/1.73m2".to_string()],
            target_units: vec!["mL/min".to_string(), "mL/min/1.73m2".to_string()],
            created_at: epoch,
        },
        // Electrophoresis fraction vs absolute concentration.
        BlockedMerge {
            biomarker_name: "albumin".to_string(),
            source_units: vec!["g/dL".to_string(), "%".to_string()],
            target_units: vec!["g/dL".to_string(), "%".to_string()],
            created_at: epoch,
        },
    ]
}

// =============================================================================
// JSONL Ledger
// =============================================================================

/// Persistence collaborator for the curated registries: append-only,
/// line-delimited JSON under a root directory. Simple, debuggable, and
/// suitable for the local single-user workflows this tracker targets.
#[derive(Debug, Clone)]
pub struct ConversionLedger {
    root: PathBuf,
    verified_path: PathBuf,
    blocked_path: PathBuf,
}

impl ConversionLedger {
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&root)?;
        let verified_path = root.join("verified.jsonl");
        let blocked_path = root.join("blocked.jsonl");
        Ok(Self {
            root,
            verified_path,
            blocked_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append a verified conversion unless its key triple already
    /// exists. Returns whether the record was written.
    pub fn log_verified(&self, conversion: &VerifiedConversion) -> anyhow::Result<bool> {
        let existing: HashSet<_> = self
            .load_verified()?
            .into_iter()
            .map(|v| v.key())
            .collect();
        if existing.contains(&conversion.key()) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.verified_path)?;
        let line = serde_json::to_string(conversion)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(true)
    }

    pub fn log_blocked(&self, blocked: &BlockedMerge) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.blocked_path)?;
        let line = serde_json::to_string(blocked)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    pub fn load_verified(&self) -> anyhow::Result<Vec<VerifiedConversion>> {
        load_jsonl(&self.verified_path, "verified conversion")
    }

    /// User-created blocks plus the shipped seed defaults.
    pub fn load_blocked(&self) -> anyhow::Result<Vec<BlockedMerge>> {
        let mut blocked = seed_blocked_merges();
        blocked.extend(load_jsonl::<BlockedMerge>(&self.blocked_path, "blocked merge")?);
        Ok(blocked)
    }
}

fn load_jsonl<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to parse {} record at line {}: {}",
                    what,
                    line_num + 1,
                    e
                );
            }
        }
    }

    Ok(records)
}

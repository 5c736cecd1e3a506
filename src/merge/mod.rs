// Biomarker Merge Orchestration
//
// Consolidating duplicate biomarker definitions that accumulated under
// different unit labels:
//
// 1. **Registries** (`registry.rs`)
//    - VerifiedConversion / BlockedMerge standing decisions
//    - JSONL ledger, the persistence collaborator for both
//
// 2. **Preview** (`preview.rs`)
//    - Read-only merge plan, recomputed on every input change
//    - Per-record outcomes, unit tallies, failure grouping
//
// 3. **Execution** (`execute.rs`)
//    - One approved snapshot in, one write-set out
//    - Rewrites before deletions, for crash safety
//
// A preview with errors blocks execution in the UI until the offending
// configs are excluded; the engine never silently drops a failed
// conversion into the target unit.

pub mod execute;
pub mod preview;
pub mod registry;

pub use execute::{execute, MergeError, MergeExecution, MergeSummary};
pub use preview::{
    build_preview, set_selected, suggest_target_unit, ConfigMergeInfo, FailedConversion,
    MergePreview, RecordConversionInfo, UnitStat,
};
pub use registry::{
    conversion_key, seed_blocked_merges, BlockedMerge, ConversionLedger, VerifiedConversion,
};

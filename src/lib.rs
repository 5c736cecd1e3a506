//! Clinical unit-conversion and biomarker-merge engine.
//!
//! This crate is the computational core of a personal health-data
//! tracker: deciding whether, and how, a numeric measurement expressed
//! in one unit (`mg/dL`) can be re-expressed in another (`mmol/L`) for a
//! named biomarker, and using that capability to safely consolidate
//! duplicate biomarker definitions that accumulated under different unit
//! labels.
//!
//! The hard part is reconciling several incompatible notions of "a
//! unit" - UCUM standard codes, bracketed assay labels like
//! `{cells}/uL`, international-unit activity measures, molar vs. mass
//! concentration - under different mathematical models: dimensional
//! algebra, molecular-weight stoichiometry, empirically fitted clinical
//! formulas, and assay-specific factors. Resolution is totally ordered
//! and deterministic, and every failure carries an auditable reason,
//! because a silent wrong answer here corrupts a medical record.
//!
//! ## Architecture
//!
//! ```text
//! units::normalize / units::classify        spelling + strategy family
//!         |
//! units::ucum                                standards-based converter
//!         |
//! knowledge                                  formulas, molar masses,
//!         |                                  assay factors, equivalences
//! convert::resolver                          ordered strategy resolution
//!         |
//! merge::preview -> merge::execute           plan, then write-set
//!         |
//! merge::registry (ConversionLedger)         curated standing decisions
//! ```
//!
//! Everything above the ledger is pure and synchronous: no I/O, no
//! shared mutable state, no clocks in the conversion path. Collaborators
//! (UI, persistence, document extraction) pass primitives in and consume
//! structured results out.

pub mod convert;
pub mod knowledge;
pub mod merge;
pub mod model;
pub mod units;

// Re-exports: the surface collaborators actually touch
pub use convert::{resolve, resolve_plain, ConversionConfig, ConversionMethod, ConversionResult};
pub use merge::{
    build_preview, execute, suggest_target_unit, BlockedMerge, ConversionLedger, MergeError,
    MergeExecution, MergePreview, MergeSummary, VerifiedConversion,
};
pub use model::{BiomarkerConfig, BiomarkerRecord, ConfigId, RecordId};
pub use units::{classify, is_opaque_label, normalize, normalize_name, UnitKind};

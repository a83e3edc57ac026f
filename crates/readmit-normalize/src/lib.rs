//! Cleaning of raw patient records.
//!
//! Aliased field names are reconciled, a binary readmission label is derived,
//! and required fields are defaulted and bounded so downstream stages can rely
//! on a fixed schema.

pub mod aliases;
pub mod cleaner;
pub mod required;
pub mod stats;
pub mod target;

pub use cleaner::{CleanOutput, Cleaner, CleanerConfig, CleaningReport};
pub use stats::DatasetStats;
pub use target::{TargetSource, derive_target, risk_level_label};

//! Feature construction for the readmission classifier.
//!
//! [`FeaturePipeline`] owns every fitted preprocessing parameter so that a
//! persisted model bundle can replay training-time transformations on a single
//! prediction request without seeing the training data again.

pub mod encoding;
pub mod imputation;
pub mod pipeline;
pub mod scaling;
pub mod selection;

pub use encoding::{CategoryEncoder, OUT_OF_VOCABULARY};
pub use imputation::NumericImputer;
pub use pipeline::{ColumnKind, FeaturePipeline, PipelineConfig};
pub use scaling::RobustScaler;
pub use selection::{FeatureSelector, SelectionMode, anova_f_scores};

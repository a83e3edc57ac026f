use thiserror::Error;

/// The training data cannot support a model fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataQualityError {
    #[error("no records available for training")]
    NoRecords,
    #[error("target column `{0}` is absent from every record")]
    MissingTarget(String),
    #[error("feature set is empty after dropping identifier columns")]
    EmptyFeatureSet,
    #[error("target has a single class ({0}); need both readmitted and non-readmitted patients")]
    SingleClass(u8),
    #[error("need at least {required} records per class, found {found}")]
    TooFewRecords { required: usize, found: usize },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, DataQualityError>;

use readmit_model::DataQualityError;
use thiserror::Error;

/// Fitting or evaluating a classifier failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnsembleError {
    #[error("cannot fit on an empty matrix")]
    EmptyInput,
    #[error("matrix has {rows} rows but {labels} labels were given")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Data(#[from] DataQualityError),
}

pub type Result<T> = std::result::Result<T, EnsembleError>;

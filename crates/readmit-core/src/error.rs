//! Errors raised by the model lifecycle.

use std::path::PathBuf;

use thiserror::Error;

use readmit_ensemble::EnsembleError;
use readmit_ingest::DataSourceError;
use readmit_model::DataQualityError;

/// The published-model slot was poisoned by a panicking writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("model state lock poisoned")]
pub struct LockPoisoned;

/// A training run failed. The previously published bundle is still current.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("data source failed: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("training data rejected: {0}")]
    DataQuality(#[from] DataQualityError),
    #[error("model fit failed: {0}")]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    LockPoisoned(#[from] LockPoisoned),
}

/// A prediction request could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("model not initialized")]
    NoModel,
    #[error("prediction request is empty")]
    EmptyRequest,
    #[error("malformed prediction request: {0}")]
    Malformed(String),
    #[error(transparent)]
    LockPoisoned(#[from] LockPoisoned),
}

/// The service configuration could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

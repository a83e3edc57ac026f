//! Data source error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to, reading from, or writing to a patient data source.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// No live store was configured.
    #[error("data source is not configured")]
    NotConfigured,

    /// The store exists but cannot be reached right now.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// File I/O error in a filesystem-backed store.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An identifier that cannot name a document.
    #[error("invalid document id {0:?}")]
    InvalidId(String),

    /// A stored document is not a JSON object.
    #[error("invalid document at {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    /// CSV input could not be parsed.
    #[error("failed to read csv {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The store refused a batch write.
    #[error("batch write rejected: {0}")]
    WriteRejected(String),

    /// Synthetic cohort parameters were rejected by a distribution.
    #[error("synthetic generator misconfigured: {0}")]
    Generator(String),
}

impl DataSourceError {
    /// True for errors that mean "the live store is not there" rather than bad data.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Unavailable(_))
    }
}

/// Result type alias for data source operations.
pub type Result<T> = std::result::Result<T, DataSourceError>;

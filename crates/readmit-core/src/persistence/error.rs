//! Bundle persistence errors.
//!
//! Every failure carries a user-facing message and, where one exists, a
//! remediation hint.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not a bundle file, or truncated.
    #[error("Invalid model bundle format: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Model bundle version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    /// Payload bytes do not hash to the stored digest.
    #[error("Model bundle checksum mismatch: {path}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to serialize model bundle")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to deserialize model bundle")]
    Deserialization {
        #[source]
        source: serde_json::Error,
    },

    /// The temp file could not be renamed over the target.
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::InvalidFormat { path, reason } => format!(
                "The file at {} is not a valid model bundle: {}",
                path.display(),
                reason
            ),
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => format!(
                "This model bundle was written by a newer release \
                (bundle version {found}, this build reads up to {max_supported})."
            ),
            Self::ChecksumMismatch { path, .. } => format!(
                "The model bundle at {} is corrupted; its contents do not match the stored checksum.",
                path.display()
            ),
            Self::Serialization { .. } => {
                "An error occurred while encoding the model bundle.".to_string()
            }
            Self::Deserialization { .. } => {
                "An error occurred while reading the model bundle. The file may be corrupted."
                    .to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the model bundle to {}. Please check disk space and permissions.",
                target_path.display()
            ),
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::InvalidFormat { .. } | Self::ChecksumMismatch { .. } => {
                Some("Delete the file and retrain with `readmit train`.".into())
            }
            Self::UnsupportedVersion { .. } => {
                Some("Upgrade readmit or retrain the model with this build.".into())
            }
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } => Some("Retrain the model to regenerate the bundle.".into()),
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or configure a different bundle path.".into())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

//! Bundle saving.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{PersistenceError, Result};
use super::format::encode_bundle;
use crate::bundle::ModelBundle;

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_synced(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.write_all(bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.to_path_buf(),
        source: e,
    })
}

/// Write a bundle to `path` through a synced temp file and a rename, so a
/// crash never leaves a half-written bundle at `path`.
pub fn save_bundle(bundle: &ModelBundle, path: &Path) -> Result<()> {
    let bytes = encode_bundle(bundle)?;
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let written = write_synced(&temp_path, &bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: path.to_path_buf(),
            source: e,
        })
    });
    if let Err(error) = written {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            tracing::debug!(path = %temp_path.display(), error = %cleanup, "temp file not removed");
        }
        return Err(error);
    }

    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved model bundle");
    Ok(())
}

//! Bundle loading.

use std::fs;
use std::path::Path;

use super::error::{PersistenceError, Result};
use super::format::decode_bundle;
use crate::bundle::ModelBundle;

pub fn load_bundle(path: &Path) -> Result<ModelBundle> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    let bundle = decode_bundle(&bytes, path)?;
    tracing::info!(
        path = %path.display(),
        trained_at = %bundle.trained_at(),
        "loaded model bundle"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::format::{CURRENT_SCHEMA_VERSION, MAGIC_BYTES};
    use crate::persistence::save::save_bundle;
    use crate::test_support::small_bundle;
    use tempfile::tempdir;

    #[test]
    fn round_trip_preserves_bundle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.rdm");
        let bundle = small_bundle();
        save_bundle(&bundle, &path).unwrap();
        assert_eq!(load_bundle(&path).unwrap(), bundle);
    }

    #[test]
    fn invalid_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.rdm");
        fs::write(&path, [b'X'; 64]).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.rdm");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC_BYTES);
        bytes.extend_from_slice(&(CURRENT_SCHEMA_VERSION + 1).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 100]);
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.rdm");
        save_bundle(&small_bundle(), &path).unwrap();
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x20;
        fs::write(&path, &bytes).unwrap();
        let error = load_bundle(&path).unwrap_err();
        assert!(matches!(error, PersistenceError::ChecksumMismatch { .. }));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.rdm");
        save_bundle(&small_bundle(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..30]).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::InvalidFormat { .. })
        ));
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let error = load_bundle(&dir.path().join("absent.rdm")).unwrap_err();
        assert!(matches!(error, PersistenceError::Io { operation: "read", .. }));
        assert!(error.user_message().contains("absent.rdm"));
    }
}

//! On-disk layout of a model bundle.
//!
//! ```text
//! +------------------+
//! | Magic: "RDM\x01" | 4 bytes
//! +------------------+
//! | Version          | 4 bytes, u32 little-endian
//! +------------------+
//! | SHA-256          | 32 bytes, digest of the payload
//! +------------------+
//! | JSON payload     | variable
//! +------------------+
//! ```

use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{PersistenceError, Result};
use crate::bundle::ModelBundle;

pub const MAGIC_BYTES: [u8; 4] = *b"RDM\x01";
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 32;

pub fn encode_bundle(bundle: &ModelBundle) -> Result<Vec<u8>> {
    let payload =
        serde_json::to_vec(bundle).map_err(|source| PersistenceError::Serialization { source })?;
    let digest = Sha256::digest(&payload);

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
    output.extend_from_slice(&MAGIC_BYTES);
    output.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    output.extend_from_slice(&digest);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Validate the header and checksum, then decode the payload.
///
/// `path` is only used to label errors.
pub fn decode_bundle(bytes: &[u8], path: &Path) -> Result<ModelBundle> {
    if bytes.len() <= HEADER_LEN {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "file too small".to_string(),
        });
    }
    if bytes[0..4] != MAGIC_BYTES {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "invalid magic bytes".to_string(),
        });
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }
    if version == 0 {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "schema version 0".to_string(),
        });
    }

    let stored = &bytes[8..HEADER_LEN];
    let payload = &bytes[HEADER_LEN..];
    let actual = Sha256::digest(payload);
    if stored != actual.as_slice() {
        return Err(PersistenceError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: hex::encode(stored),
            actual: hex::encode(actual),
        });
    }

    serde_json::from_slice(payload).map_err(|source| PersistenceError::Deserialization { source })
}

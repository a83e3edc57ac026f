//! Filesystem-backed document store.
//!
//! Layout mirrors the remote hierarchy:
//!
//! ```text
//! <root>/Hospital/<hospital_id>/hospital.json
//! <root>/Hospital/<hospital_id>/csv_data/<doc_id>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use readmit_model::PatientRecord;

use crate::error::{DataSourceError, Result};
use crate::store::{DocumentStore, HospitalMetadata, PATIENT_COLLECTION, PatientDocument};

const HOSPITAL_COLLECTION: &str = "Hospital";
const HOSPITAL_DOCUMENT: &str = "hospital.json";

/// Document store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn hospitals_dir(&self) -> PathBuf {
        self.root.join(HOSPITAL_COLLECTION)
    }

    fn hospital_dir(&self, hospital_id: &str) -> Result<PathBuf> {
        Ok(self.hospitals_dir().join(encode_id(hospital_id)?))
    }

    fn patients_dir(&self, hospital_id: &str) -> Result<PathBuf> {
        Ok(self.hospital_dir(hospital_id)?.join(PATIENT_COLLECTION))
    }

    pub fn read_hospital(&self, hospital_id: &str) -> Result<Option<HospitalMetadata>> {
        let path = self.hospital_dir(hospital_id)?.join(HOSPITAL_DOCUMENT);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|source| DataSourceError::Io {
            operation: "read",
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DataSourceError::InvalidDocument {
                path,
                reason: e.to_string(),
            })
    }
}

/// Map an id to one path component. Bytes outside `[A-Za-z0-9_-]` become
/// `%XX`, as does a leading `.`, so distinct ids never share a file and no id
/// resolves to `.` or `..`.
fn encode_id(id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(DataSourceError::InvalidId(id.to_string()));
    }
    let mut encoded = String::with_capacity(id.len());
    for (index, byte) in id.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && index > 0);
        if keep {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    Ok(encoded)
}

/// Inverse of [`encode_id`]. `None` for names it could not have produced.
fn decode_id(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = name.get(index + 1..index + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| DataSourceError::Io {
        operation: "list",
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataSourceError::Io {
            operation: "list",
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Write through a temp file and rename so readers never see half a document.
fn write_json_atomic(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| DataSourceError::InvalidDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes).map_err(|source| DataSourceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| DataSourceError::Io {
        operation: "rename",
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| DataSourceError::Io {
        operation: "create directory",
        path: path.to_path_buf(),
        source,
    })
}

impl DocumentStore for LocalDocumentStore {
    fn ping(&self) -> Result<()> {
        if self.hospitals_dir().is_dir() {
            Ok(())
        } else {
            Err(DataSourceError::Unavailable(format!(
                "no hospital collection under {}",
                self.root.display()
            )))
        }
    }

    fn list_hospitals(&self) -> Result<Vec<String>> {
        self.ping()?;
        Ok(sorted_entries(&self.hospitals_dir())?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| decode_id(path.file_name()?.to_str()?))
            .collect())
    }

    fn list_patients(&self, hospital_id: &str) -> Result<Vec<PatientRecord>> {
        let dir = self.patients_dir(hospital_id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for path in sorted_entries(&dir)? {
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).map_err(|source| DataSourceError::Io {
                operation: "read",
                path: path.clone(),
                source,
            })?;
            let value: serde_json::Value =
                serde_json::from_slice(&bytes).map_err(|e| DataSourceError::InvalidDocument {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let record =
                PatientRecord::try_from(value).map_err(|_| DataSourceError::InvalidDocument {
                    path: path.clone(),
                    reason: "expected a JSON object".to_string(),
                })?;
            records.push(record);
        }
        Ok(records)
    }

    fn write_hospital(&self, hospital_id: &str, metadata: &HospitalMetadata) -> Result<()> {
        let dir = self.hospital_dir(hospital_id)?;
        create_dir(&dir)?;
        let created_at = self
            .read_hospital(hospital_id)?
            .and_then(|existing| existing.created_at)
            .or(metadata.created_at);
        let merged = HospitalMetadata {
            created_at,
            ..metadata.clone()
        };
        write_json_atomic(&dir.join(HOSPITAL_DOCUMENT), &merged)
    }

    fn write_batch(&self, hospital_id: &str, documents: &[PatientDocument]) -> Result<()> {
        let dir = self.patients_dir(hospital_id)?;
        create_dir(&dir)?;
        for (doc_id, record) in documents {
            let path = dir.join(format!("{}.json", encode_id(doc_id)?));
            write_json_atomic(&path, record)?;
        }
        tracing::debug!(
            hospital_id,
            documents = documents.len(),
            "wrote patient batch"
        );
        Ok(())
    }
}

//! Hierarchical hospital/patient document stores.
//!
//! A store holds a collection of hospitals, each owning a `csv_data`
//! sub-collection of patient documents keyed by a derived identifier.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use readmit_model::PatientRecord;

use crate::error::{DataSourceError, Result};

/// Name of the per-hospital patient sub-collection.
pub const PATIENT_COLLECTION: &str = "csv_data";

/// Hospital-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalMetadata {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HospitalMetadata {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            total_records: 0,
            created_at: Some(Utc::now()),
        }
    }
}

/// A patient document together with its identifier inside the sub-collection.
pub type PatientDocument = (String, PatientRecord);

/// Access to a live patient store.
///
/// Implementations must be safe to share between the serving tasks and the
/// background retrain task.
pub trait DocumentStore: Send + Sync {
    /// Cheap connectivity check.
    fn ping(&self) -> Result<()>;

    /// Hospital identifiers, in a stable order.
    fn list_hospitals(&self) -> Result<Vec<String>>;

    /// All patient documents belonging to one hospital.
    fn list_patients(&self, hospital_id: &str) -> Result<Vec<PatientRecord>>;

    /// Create or merge the hospital document.
    fn write_hospital(&self, hospital_id: &str, metadata: &HospitalMetadata) -> Result<()>;

    /// Write one batch of patient documents. All-or-nothing.
    fn write_batch(&self, hospital_id: &str, documents: &[PatientDocument]) -> Result<()>;
}

#[derive(Debug, Default)]
struct HospitalEntry {
    metadata: Option<HospitalMetadata>,
    patients: BTreeMap<String, PatientRecord>,
}

/// In-process store used for tests and for running without a live backend.
///
/// Connectivity and write failures can be simulated.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    hospitals: RwLock<BTreeMap<String, HospitalEntry>>,
    offline: AtomicBool,
    failing_writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a hospital with patient records keyed `patient_<n>`.
    pub fn with_patients(self, hospital_id: &str, records: Vec<PatientRecord>) -> Self {
        if let Ok(mut hospitals) = self.hospitals.write() {
            let entry = hospitals.entry(hospital_id.to_string()).or_default();
            let offset = entry.patients.len();
            for (index, record) in records.into_iter().enumerate() {
                entry
                    .patients
                    .insert(format!("patient_{}", offset + index + 1), record);
            }
        }
        self
    }

    /// Make every read fail with [`DataSourceError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject the next `count` batch writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn patient_count(&self, hospital_id: &str) -> usize {
        self.hospitals
            .read()
            .ok()
            .and_then(|hospitals| hospitals.get(hospital_id).map(|entry| entry.patients.len()))
            .unwrap_or(0)
    }

    pub fn hospital_metadata(&self, hospital_id: &str) -> Option<HospitalMetadata> {
        self.hospitals
            .read()
            .ok()
            .and_then(|hospitals| hospitals.get(hospital_id)?.metadata.clone())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DataSourceError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn poisoned() -> DataSourceError {
    DataSourceError::Unavailable("store lock poisoned".to_string())
}

impl DocumentStore for MemoryDocumentStore {
    fn ping(&self) -> Result<()> {
        self.check_online()
    }

    fn list_hospitals(&self) -> Result<Vec<String>> {
        self.check_online()?;
        let hospitals = self.hospitals.read().map_err(|_| poisoned())?;
        Ok(hospitals.keys().cloned().collect())
    }

    fn list_patients(&self, hospital_id: &str) -> Result<Vec<PatientRecord>> {
        self.check_online()?;
        let hospitals = self.hospitals.read().map_err(|_| poisoned())?;
        Ok(hospitals
            .get(hospital_id)
            .map(|entry| entry.patients.values().cloned().collect())
            .unwrap_or_default())
    }

    fn write_hospital(&self, hospital_id: &str, metadata: &HospitalMetadata) -> Result<()> {
        self.check_online()?;
        let mut hospitals = self.hospitals.write().map_err(|_| poisoned())?;
        let entry = hospitals.entry(hospital_id.to_string()).or_default();
        let created_at = entry
            .metadata
            .as_ref()
            .and_then(|existing| existing.created_at)
            .or(metadata.created_at);
        entry.metadata = Some(HospitalMetadata {
            created_at,
            ..metadata.clone()
        });
        Ok(())
    }

    fn write_batch(&self, hospital_id: &str, documents: &[PatientDocument]) -> Result<()> {
        self.check_online()?;
        let remaining = self.failing_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(DataSourceError::WriteRejected(
                "simulated write failure".to_string(),
            ));
        }
        let mut hospitals = self.hospitals.write().map_err(|_| poisoned())?;
        let entry = hospitals.entry(hospital_id.to_string()).or_default();
        for (doc_id, record) in documents {
            entry.patients.insert(doc_id.clone(), record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(age: i64) -> PatientRecord {
        PatientRecord::try_from(json!({ "age": age })).unwrap()
    }

    #[test]
    fn seeded_patients_are_listed() {
        let store = MemoryDocumentStore::new().with_patients("apollo", vec![record(40), record(50)]);
        assert_eq!(store.list_hospitals().unwrap(), vec!["apollo".to_string()]);
        assert_eq!(store.list_patients("apollo").unwrap().len(), 2);
        assert!(store.list_patients("missing").unwrap().is_empty());
    }

    #[test]
    fn offline_store_fails_reads() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        assert!(store.ping().is_err());
        assert!(store.list_hospitals().unwrap_err().is_connectivity());
    }

    #[test]
    fn simulated_write_failures_are_consumed() {
        let store = MemoryDocumentStore::new();
        store.fail_next_writes(1);
        let docs = vec![("patient_1".to_string(), record(30))];
        assert!(store.write_batch("h", &docs).is_err());
        assert!(store.write_batch("h", &docs).is_ok());
        assert_eq!(store.patient_count("h"), 1);
    }

    #[test]
    fn hospital_metadata_keeps_first_creation_time() {
        let store = MemoryDocumentStore::new();
        let first = HospitalMetadata::new("Apollo Hospital", "Chennai");
        store.write_hospital("apollo", &first).unwrap();
        let mut update = first.clone();
        update.total_records = 12;
        update.created_at = None;
        store.write_hospital("apollo", &update).unwrap();
        let stored = store.hospital_metadata("apollo").unwrap();
        assert_eq!(stored.total_records, 12);
        assert_eq!(stored.created_at, first.created_at);
    }
}

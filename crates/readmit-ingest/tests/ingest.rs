//! Integration tests for fetch fallback and batch upload.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use readmit_ingest::{
    BatchUploader, DataProvenance, DataSourceAdapter, DocumentStore, HospitalTarget,
    LocalDocumentStore, MemoryDocumentStore, Sleeper, SyntheticConfig, UploadConfig,
};
use readmit_model::PatientRecord;
use serde_json::json;

fn patients(count: usize) -> Vec<PatientRecord> {
    (0..count)
        .map(|i| {
            PatientRecord::try_from(json!({
                "patient_id": format!("P{i}"),
                "age": 40 + (i % 50),
                "diagnosis": "COPD",
            }))
            .unwrap()
        })
        .collect()
}

fn small_synthetic() -> SyntheticConfig {
    SyntheticConfig {
        seed: 42,
        samples: 150,
    }
}

#[derive(Default, Clone)]
struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

fn fast_upload() -> UploadConfig {
    UploadConfig {
        batch_size: 100,
        max_attempts: 3,
        backoff_base: Duration::from_millis(10),
        batch_delay: Duration::ZERO,
    }
}

fn target() -> HospitalTarget {
    HospitalTarget {
        id: "apollo".to_string(),
        name: "Apollo Hospital".to_string(),
        location: "Chennai".to_string(),
    }
}

#[test]
fn fetch_uses_live_data_when_plentiful() {
    let store = MemoryDocumentStore::new()
        .with_patients("apollo", patients(80))
        .with_patients("jipmer", patients(40));
    let adapter = DataSourceAdapter::new(Some(Arc::new(store)), small_synthetic());
    let outcome = adapter.fetch().unwrap();
    assert_eq!(outcome.provenance, DataProvenance::Live);
    assert_eq!(outcome.records.len(), 120);
    assert!(
        outcome
            .records
            .iter()
            .all(|record| record.has_value("hospital_id"))
    );
}

#[test]
fn small_live_fetch_is_supplemented_to_minimum() {
    let store = MemoryDocumentStore::new().with_patients("apollo", patients(12));
    let adapter = DataSourceAdapter::new(Some(Arc::new(store)), small_synthetic());
    let outcome = adapter.fetch().unwrap();
    assert_eq!(outcome.provenance, DataProvenance::Supplemented);
    assert_eq!(outcome.live_records, 12);
    assert!(outcome.records.len() >= 100);
    assert_eq!(outcome.records.len(), 12 + 150);
}

#[test]
fn supplementation_repeats_small_cohorts_until_minimum() {
    let store = MemoryDocumentStore::new().with_patients("apollo", patients(5));
    let adapter = DataSourceAdapter::new(
        Some(Arc::new(store)),
        SyntheticConfig {
            seed: 1,
            samples: 30,
        },
    );
    let outcome = adapter.fetch().unwrap();
    assert!(outcome.records.len() >= 100);
}

#[test]
fn offline_store_falls_back_to_synthetic() {
    let store = MemoryDocumentStore::new().with_patients("apollo", patients(500));
    store.set_offline(true);
    let adapter = DataSourceAdapter::new(Some(Arc::new(store)), small_synthetic());
    assert!(!adapter.is_reachable());
    let outcome = adapter.fetch().unwrap();
    assert_eq!(outcome.provenance, DataProvenance::Synthetic);
    assert_eq!(outcome.records.len(), 150);
}

#[test]
fn empty_store_and_missing_store_use_synthetic() {
    let empty = DataSourceAdapter::new(Some(Arc::new(MemoryDocumentStore::new())), small_synthetic());
    assert_eq!(empty.fetch().unwrap().provenance, DataProvenance::Synthetic);

    let none = DataSourceAdapter::synthetic_only(small_synthetic());
    assert!(!none.is_reachable());
    assert_eq!(none.fetch().unwrap().provenance, DataProvenance::Synthetic);
}

#[test]
fn upload_retries_then_reports_failed_batch() {
    let store = MemoryDocumentStore::new();
    store.fail_next_writes(3);
    let sleeper = RecordingSleeper::default();
    let uploader = BatchUploader::with_sleeper(fast_upload(), Box::new(sleeper.clone()));

    let report = uploader.upload(&store, &target(), &patients(250)).unwrap();

    assert_eq!(report.total, 250);
    assert_eq!(report.failed, 100);
    assert_eq!(report.uploaded, 150);
    assert_eq!(report.failed_batches, vec![0]);
    let waits = sleeper.waits.lock().unwrap().clone();
    assert_eq!(
        waits,
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );
    assert!(waits.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(store.patient_count("apollo"), 150);
    assert_eq!(store.hospital_metadata("apollo").unwrap().total_records, 150);
}

#[test]
fn upload_recovers_after_transient_failure() {
    let store = MemoryDocumentStore::new();
    store.fail_next_writes(1);
    let sleeper = RecordingSleeper::default();
    let uploader = BatchUploader::with_sleeper(fast_upload(), Box::new(sleeper.clone()));

    let report = uploader.upload(&store, &target(), &patients(30)).unwrap();

    assert_eq!(report.uploaded, 30);
    assert_eq!(report.failed, 0);
    assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::from_millis(10)]);
}

#[test]
fn uploaded_records_are_fetchable_from_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalDocumentStore::new(dir.path());
    let uploader = BatchUploader::with_sleeper(fast_upload(), Box::new(RecordingSleeper::default()));
    uploader.upload(&store, &target(), &patients(120)).unwrap();

    assert!(store.ping().is_ok());
    let adapter = DataSourceAdapter::new(Some(Arc::new(store)), small_synthetic());
    let outcome = adapter.fetch().unwrap();
    assert_eq!(outcome.provenance, DataProvenance::Live);
    assert_eq!(outcome.records.len(), 120);
}

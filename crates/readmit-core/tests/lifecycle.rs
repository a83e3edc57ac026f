//! Integration tests for training, publication, persistence and prediction.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use readmit_core::{
    ModelBundle, ModelManager, PredictionService, StartupSource, TrainingConfig, TrainingError,
    request_row,
};
use readmit_ensemble::EnsembleConfig;
use readmit_ingest::{
    DataProvenance, DataSourceAdapter, DocumentStore, HospitalMetadata, MemoryDocumentStore,
    PatientDocument, SyntheticConfig, SyntheticGenerator,
};
use readmit_model::{PatientRecord, PredictionResult, fields};
use serde_json::{Value, json};
use tempfile::tempdir;

fn fast_training() -> TrainingConfig {
    TrainingConfig {
        ensemble: EnsembleConfig::fast(),
        ..TrainingConfig::default()
    }
}

fn synthetic(seed: u64, samples: usize) -> SyntheticConfig {
    SyntheticConfig { seed, samples }
}

fn synthetic_manager() -> ModelManager {
    ModelManager::new(
        DataSourceAdapter::synthetic_only(synthetic(42, 300)),
        fast_training(),
    )
}

/// Manager whose live store holds a cohort distinct from its synthetic one.
fn live_manager(live: Vec<PatientRecord>) -> ModelManager {
    let store = MemoryDocumentStore::new().with_patients("hospital_a", live);
    let adapter = DataSourceAdapter::new(
        Some(Arc::new(store) as Arc<dyn DocumentStore>),
        synthetic(42, 300),
    )
    .with_min_live_records(50);
    ModelManager::new(adapter, fast_training())
}

/// Store that records how many patient listings run at the same time.
struct CountingStore {
    inner: MemoryDocumentStore,
    active: AtomicUsize,
    peak: AtomicUsize,
    listings: AtomicUsize,
}

impl CountingStore {
    fn new(records: Vec<PatientRecord>) -> Self {
        Self {
            inner: MemoryDocumentStore::new().with_patients("hospital_a", records),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
        }
    }
}

impl DocumentStore for CountingStore {
    fn ping(&self) -> readmit_ingest::Result<()> {
        self.inner.ping()
    }

    fn list_hospitals(&self) -> readmit_ingest::Result<Vec<String>> {
        self.inner.list_hospitals()
    }

    fn list_patients(&self, hospital_id: &str) -> readmit_ingest::Result<Vec<PatientRecord>> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        self.listings.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        let patients = self.inner.list_patients(hospital_id);
        self.active.fetch_sub(1, Ordering::SeqCst);
        patients
    }

    fn write_hospital(
        &self,
        hospital_id: &str,
        metadata: &HospitalMetadata,
    ) -> readmit_ingest::Result<()> {
        self.inner.write_hospital(hospital_id, metadata)
    }

    fn write_batch(
        &self,
        hospital_id: &str,
        documents: &[PatientDocument],
    ) -> readmit_ingest::Result<()> {
        self.inner.write_batch(hospital_id, documents)
    }
}

fn cohort(seed: u64, samples: usize) -> Vec<PatientRecord> {
    SyntheticGenerator::new(synthetic(seed, samples))
        .generate()
        .unwrap()
}

fn request(value: Value) -> PatientRecord {
    PatientRecord::try_from(value).unwrap()
}

fn sample_requests() -> Vec<PatientRecord> {
    vec![
        request(json!({
            "age": 82,
            "gender": "Female",
            "diagnosis": "Heart Failure",
            "length_of_stay": 12,
            "num_medications": 18,
            "num_procedures": 4,
            "emergency_admission": 1,
            "discharge_location": "Skilled Nursing Facility",
        })),
        request(json!({
            "age": 34,
            "gender": "Male",
            "primary_diagnosis": "Pneumonia",
            "length_of_stay": 2,
            "num_medications_prescribed": 3,
            "admission_type": "Elective",
            "discharge_location": "Home",
        })),
        request(json!({ "age": "n/a", "primary_diagnosis": "Never Seen Before" })),
    ]
}

fn expected(bundle: &ModelBundle, record: &PatientRecord) -> PredictionResult {
    let row = request_row(record);
    let disease = row
        .get(fields::PRIMARY_DIAGNOSIS)
        .and_then(|value| value.as_text())
        .unwrap_or_else(|| fields::UNKNOWN_CATEGORY.to_string());
    PredictionResult::new(
        bundle.probability(&row),
        disease,
        bundle.accuracy(),
        bundle.trained_at(),
    )
}

#[test]
fn training_publishes_a_bundle() {
    let manager = synthetic_manager();
    assert!(manager.current().unwrap().is_none());

    let outcome = manager.train(true).unwrap();
    let current = manager.current().unwrap().unwrap();

    assert!(Arc::ptr_eq(&outcome.bundle, &current));
    assert!(!outcome.persisted);
    assert_eq!(current.data_source(), DataProvenance::Synthetic);
    assert_eq!(current.training_records(), 300);
    assert_eq!(current.algorithm_names().len(), 4);
    let metrics = current.metrics();
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert!((0.0..=1.0).contains(&metrics.auc));
    assert!(metrics.cv_std >= 0.0);
    assert_eq!(manager.attempts(), 1);
    assert!(manager.last_attempt().is_some());
}

#[test]
fn persisted_bundle_reloads_with_identical_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("readmission.rdm");

    let trainer = synthetic_manager().with_bundle_path(&path);
    let outcome = trainer.train(true).unwrap();
    assert!(outcome.persisted);
    assert!(path.exists());

    let reloaded = synthetic_manager().with_bundle_path(&path);
    assert_eq!(reloaded.load_or_train().unwrap(), StartupSource::Loaded);
    assert_eq!(reloaded.attempts(), 0);
    let bundle = reloaded.current().unwrap().unwrap();
    assert_eq!(*bundle, *outcome.bundle);

    let original = PredictionService::new(Arc::new(trainer));
    let restored = PredictionService::new(Arc::new(reloaded));
    for record in sample_requests() {
        assert_eq!(
            original.predict(&record).unwrap(),
            restored.predict(&record).unwrap()
        );
    }
}

#[test]
fn load_or_train_trains_when_nothing_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.rdm");
    let manager = synthetic_manager().with_bundle_path(&path);
    assert_eq!(manager.load_or_train().unwrap(), StartupSource::Trained);
    assert!(path.exists());
}

#[test]
fn corrupt_bundle_file_falls_back_to_training() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.rdm");
    fs::write(&path, b"not a bundle at all, just some bytes on disk").unwrap();
    let manager = synthetic_manager().with_bundle_path(&path);
    assert_eq!(manager.load_or_train().unwrap(), StartupSource::Trained);
    assert!(manager.current().unwrap().is_some());
}

#[test]
fn failed_training_keeps_previous_bundle_and_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("readmission.rdm");

    let mut single_class = cohort(7, 200);
    for record in &mut single_class {
        record.insert(fields::TARGET, 0);
    }
    let manager = live_manager(single_class).with_bundle_path(&path);

    let first = manager.train(false).unwrap();
    let bytes_before = fs::read(&path).unwrap();

    let error = manager.train(true).unwrap_err();
    assert!(
        matches!(error, TrainingError::Ensemble(_) | TrainingError::DataQuality(_)),
        "unexpected error: {error}"
    );
    let current = manager.current().unwrap().unwrap();
    assert!(Arc::ptr_eq(&current, &first.bundle));
    assert_eq!(fs::read(&path).unwrap(), bytes_before);
    assert_eq!(manager.attempts(), 2);
}

#[test]
fn empty_cohort_is_rejected_without_publishing() {
    let manager = ModelManager::new(
        DataSourceAdapter::synthetic_only(synthetic(42, 0)),
        fast_training(),
    );
    assert!(manager.train(true).is_err());
    assert!(manager.current().unwrap().is_none());
}

#[test]
fn repeated_predictions_are_bit_identical() {
    let manager = Arc::new(synthetic_manager());
    manager.train(true).unwrap();
    let service = PredictionService::new(manager);
    for record in sample_requests() {
        let first = service.predict(&record).unwrap();
        let second = service.predict(&record).unwrap();
        assert_eq!(first.probability.to_bits(), second.probability.to_bits());
        assert_eq!(first, second);
    }
}

#[test]
fn unseen_and_missing_values_still_score() {
    let manager = Arc::new(synthetic_manager());
    manager.train(true).unwrap();
    let service = PredictionService::new(manager);

    let result = service
        .predict(&request(json!({ "primary_diagnosis": "Never Seen Before" })))
        .unwrap();
    assert!((0.0..=1.0).contains(&result.probability));
    assert_eq!(result.disease_type, "Never Seen Before");

    let result = service.predict(&request(json!({ "age": 70 }))).unwrap();
    assert_eq!(result.disease_type, "Unknown");
}

#[test]
fn prediction_without_model_or_payload_fails() {
    let manager = Arc::new(synthetic_manager());
    let service = PredictionService::new(Arc::clone(&manager));
    let record = request(json!({ "age": 60 }));
    assert_eq!(
        service.predict(&record).unwrap_err(),
        readmit_core::PredictionError::NoModel
    );

    manager.train(true).unwrap();
    assert_eq!(
        service.predict(&PatientRecord::new()).unwrap_err(),
        readmit_core::PredictionError::EmptyRequest
    );
}

#[test]
fn predictions_during_retrain_see_exactly_one_bundle() {
    let manager = Arc::new(live_manager(cohort(99, 250)));
    let before = manager.train(false).unwrap().bundle;
    let service = PredictionService::new(Arc::clone(&manager));
    let requests = sample_requests();

    let retrainer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.train(true).map(|outcome| outcome.bundle))
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let requests = requests.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..25 {
                    for record in &requests {
                        seen.push((record.clone(), service.predict(record).unwrap()));
                    }
                }
                seen
            })
        })
        .collect();

    let after = retrainer.join().unwrap().unwrap();
    assert_eq!(after.data_source(), DataProvenance::Live);
    assert!(!Arc::ptr_eq(&before, &after));

    for reader in readers {
        for (record, result) in reader.join().unwrap() {
            let old = expected(&before, &record);
            let new = expected(&after, &record);
            assert!(
                result == old || result == new,
                "prediction {result:?} matches neither bundle"
            );
        }
    }
}

#[test]
fn data_stats_describe_the_training_cohort() {
    let manager = synthetic_manager();
    let (stats, source) = manager.data_stats().unwrap();
    assert_eq!(source, DataProvenance::Synthetic);
    assert_eq!(stats.total_records, 300);
    assert!((0.0..=1.0).contains(&stats.readmission_rate));
    assert!(stats.age_mean >= 18.0);
}

#[test]
fn load_persisted_never_trains() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("readmission.rdm");
    let manager = synthetic_manager().with_bundle_path(&path);
    assert!(!manager.load_persisted().unwrap());
    assert_eq!(manager.attempts(), 0);

    synthetic_manager().with_bundle_path(&path).train(true).unwrap();
    assert!(manager.load_persisted().unwrap());
    assert!(manager.current().unwrap().is_some());
    assert_eq!(manager.attempts(), 0);
}

#[test]
fn concurrent_training_runs_one_at_a_time() {
    let store = Arc::new(CountingStore::new(cohort(5, 200)));
    let adapter = DataSourceAdapter::new(
        Some(Arc::clone(&store) as Arc<dyn DocumentStore>),
        synthetic(42, 300),
    )
    .with_min_live_records(50);
    let manager = Arc::new(ModelManager::new(adapter, fast_training()));
    let start = Arc::new(Barrier::new(2));

    let runs: Vec<_> = (0..2)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                manager.train(true)
            })
        })
        .collect();
    let outcomes: Vec<_> = runs
        .into_iter()
        .map(|run| run.join().unwrap().unwrap())
        .collect();

    assert_eq!(manager.attempts(), 2);
    assert_eq!(store.listings.load(Ordering::SeqCst), 2);
    assert_eq!(store.peak.load(Ordering::SeqCst), 1);
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.bundle.data_source() == DataProvenance::Live)
    );
    let current = manager.current().unwrap().unwrap();
    assert!(outcomes.iter().any(|outcome| Arc::ptr_eq(&outcome.bundle, &current)));
}

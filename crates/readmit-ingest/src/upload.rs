//! Chunked bulk upload of patient records with bounded retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use readmit_model::{PatientRecord, fields};

use crate::error::Result;
use crate::store::{DocumentStore, HospitalMetadata, PatientDocument};

/// Longest string value accepted by the store, in bytes.
pub const MAX_STRING_BYTES: usize = 1_000_000;
/// Largest batch the store accepts in one write.
pub const MAX_BATCH_SIZE: usize = 500;

/// Upload tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Documents per batch write (clamped to `1..=500`).
    pub batch_size: usize,
    /// Attempts per batch before it is reported as failed.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base` before the next one.
    #[serde(with = "millis")]
    pub backoff_base: Duration,
    /// Pause between batches.
    #[serde(with = "millis")]
    pub batch_delay: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            batch_delay: Duration::from_millis(100),
        }
    }
}

impl UploadConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Blocking pause between attempts. Injected so tests can observe backoff.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Outcome of an upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Zero-based indices of batches that exhausted their attempts.
    pub failed_batches: Vec<usize>,
}

/// Identifier of the hospital receiving an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HospitalTarget {
    pub id: String,
    pub name: String,
    pub location: String,
}

/// Derive the document key: `patient_<patient_id>`, else `patient_<id>`, else positional.
pub fn document_id(record: &PatientRecord, row_index: usize) -> String {
    for key in [fields::PATIENT_ID, "id"] {
        if let Some(id) = record.field(key).as_text() {
            return format!("patient_{id}");
        }
    }
    format!("patient_{}", row_index + 1)
}

/// Make a record acceptable to the store: drop non-finite numbers, cap string length.
pub fn sanitize_record(record: &PatientRecord) -> PatientRecord {
    record
        .iter()
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Number(number) if number.as_f64().is_some_and(|n| !n.is_finite()) => Value::Null,
        Value::String(text) if text.len() > MAX_STRING_BYTES => {
            let mut end = MAX_STRING_BYTES;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            Value::String(text[..end].to_string())
        }
        other => other.clone(),
    }
}

/// Uploads records to a [`DocumentStore`] in retried batches.
pub struct BatchUploader {
    config: UploadConfig,
    sleeper: Box<dyn Sleeper>,
}

impl BatchUploader {
    pub fn new(config: UploadConfig) -> Self {
        Self::with_sleeper(config, Box::new(ThreadSleeper))
    }

    pub fn with_sleeper(config: UploadConfig, sleeper: Box<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    /// Write the hospital document, then every record in batches.
    ///
    /// A batch that fails `max_attempts` times is counted in
    /// [`UploadReport::failed`]; the remaining batches still run. Only a failure
    /// to write the hospital document itself is returned as an error.
    pub fn upload(
        &self,
        store: &dyn DocumentStore,
        hospital: &HospitalTarget,
        records: &[PatientRecord],
    ) -> Result<UploadReport> {
        let mut metadata = HospitalMetadata::new(&hospital.name, &hospital.location);
        store.write_hospital(&hospital.id, &metadata)?;

        let batch_size = self.config.effective_batch_size();
        let mut report = UploadReport {
            total: records.len(),
            ..UploadReport::default()
        };

        for (batch_index, chunk) in records.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            let documents: Vec<PatientDocument> = chunk
                .iter()
                .enumerate()
                .map(|(i, record)| (document_id(record, offset + i), sanitize_record(record)))
                .collect();

            if self.write_with_retry(store, &hospital.id, &documents) {
                report.uploaded += documents.len();
                info!(
                    hospital_id = %hospital.id,
                    uploaded = report.uploaded,
                    total = report.total,
                    "uploaded batch"
                );
            } else {
                report.failed += documents.len();
                report.failed_batches.push(batch_index);
            }

            if !self.config.batch_delay.is_zero() {
                self.sleeper.sleep(self.config.batch_delay);
            }
        }

        metadata.total_records = report.uploaded;
        if let Err(error) = store.write_hospital(&hospital.id, &metadata) {
            warn!(hospital_id = %hospital.id, %error, "could not update hospital record count");
        }
        Ok(report)
    }

    fn write_with_retry(
        &self,
        store: &dyn DocumentStore,
        hospital_id: &str,
        documents: &[PatientDocument],
    ) -> bool {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            match store.write_batch(hospital_id, documents) {
                Ok(()) => return true,
                Err(error) => {
                    warn!(hospital_id, attempt, %error, "batch upload attempt failed");
                    if attempt < attempts {
                        self.sleeper.sleep(self.config.backoff_for(attempt));
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_ids_prefer_patient_id() {
        let with_patient = PatientRecord::try_from(json!({"patient_id": "P7", "id": 3})).unwrap();
        let with_id = PatientRecord::try_from(json!({"patient_id": null, "id": 3})).unwrap();
        let bare = PatientRecord::try_from(json!({"age": 50})).unwrap();
        assert_eq!(document_id(&with_patient, 0), "patient_P7");
        assert_eq!(document_id(&with_id, 0), "patient_3");
        assert_eq!(document_id(&bare, 4), "patient_5");
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "é".repeat(MAX_STRING_BYTES);
        let record = PatientRecord::try_from(json!({ "notes": long })).unwrap();
        let cleaned = sanitize_record(&record);
        let notes = cleaned.get("notes").and_then(Value::as_str).unwrap();
        assert!(notes.len() <= MAX_STRING_BYTES);
        assert!(notes.len() >= MAX_STRING_BYTES - 1);
    }

    #[test]
    fn backoff_grows_linearly_with_attempt() {
        let config = UploadConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_secs(2));
        assert_eq!(config.backoff_for(2), Duration::from_secs(4));
    }

    #[test]
    fn batch_size_is_clamped() {
        let config = UploadConfig {
            batch_size: 10_000,
            ..UploadConfig::default()
        };
        assert_eq!(config.effective_batch_size(), MAX_BATCH_SIZE);
    }
}

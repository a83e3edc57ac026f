//! Live-first patient fetch with synthetic fallback.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use readmit_model::{PatientRecord, fields};

use crate::error::{DataSourceError, Result};
use crate::store::DocumentStore;
use crate::synthetic::{SyntheticConfig, SyntheticGenerator};

/// Live fetches smaller than this are supplemented with synthetic records.
pub const MIN_LIVE_RECORDS: usize = 100;

/// Where the records of a fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvenance {
    Live,
    Supplemented,
    Synthetic,
}

impl fmt::Display for DataProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Supplemented => "live + synthetic",
            Self::Synthetic => "synthetic",
        })
    }
}

/// Records returned by [`DataSourceAdapter::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<PatientRecord>,
    pub provenance: DataProvenance,
    /// Number of records that came from the live store.
    pub live_records: usize,
}

/// Chooses between the live store and the synthetic generator.
#[derive(Clone)]
pub struct DataSourceAdapter {
    store: Option<Arc<dyn DocumentStore>>,
    generator: SyntheticGenerator,
    min_live_records: usize,
}

impl fmt::Debug for DataSourceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceAdapter")
            .field("store", &self.store.is_some())
            .field("generator", &self.generator)
            .field("min_live_records", &self.min_live_records)
            .finish()
    }
}

impl DataSourceAdapter {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, synthetic: SyntheticConfig) -> Self {
        Self {
            store,
            generator: SyntheticGenerator::new(synthetic),
            min_live_records: MIN_LIVE_RECORDS,
        }
    }

    /// Adapter with no live store; every fetch is synthetic.
    pub fn synthetic_only(synthetic: SyntheticConfig) -> Self {
        Self::new(None, synthetic)
    }

    #[must_use]
    pub fn with_min_live_records(mut self, min: usize) -> Self {
        self.min_live_records = min;
        self
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// True when a live store is configured and answers a ping.
    pub fn is_reachable(&self) -> bool {
        self.store.as_ref().is_some_and(|store| store.ping().is_ok())
    }

    /// Every patient in every hospital, tagged with `hospital_id`.
    pub fn fetch_live(&self) -> Result<Vec<PatientRecord>> {
        let store = self.store.as_ref().ok_or(DataSourceError::NotConfigured)?;
        let mut records = Vec::new();
        for hospital_id in store.list_hospitals()? {
            let patients = store.list_patients(&hospital_id)?;
            tracing::debug!(%hospital_id, patients = patients.len(), "fetched hospital");
            records.extend(patients.into_iter().map(|mut record| {
                record.insert(fields::HOSPITAL_ID, Value::String(hospital_id.clone()));
                record
            }));
        }
        Ok(records)
    }

    pub fn fetch_synthetic(&self) -> Result<FetchOutcome> {
        Ok(FetchOutcome {
            records: self.generator.generate()?,
            provenance: DataProvenance::Synthetic,
            live_records: 0,
        })
    }

    /// Fetch training records, falling back to or topping up with synthetic data.
    ///
    /// Store failures never surface here; only a misconfigured generator does.
    pub fn fetch(&self) -> Result<FetchOutcome> {
        let live = match self.fetch_live() {
            Ok(records) => records,
            Err(DataSourceError::NotConfigured) => {
                info!("no live data source configured, using synthetic data");
                return self.fetch_synthetic();
            }
            Err(error) => {
                warn!(%error, "live fetch failed, using synthetic data");
                return self.fetch_synthetic();
            }
        };

        if live.is_empty() {
            info!("live data source returned no records, using synthetic data");
            return self.fetch_synthetic();
        }

        let live_records = live.len();
        if live_records >= self.min_live_records {
            info!(records = live_records, "fetched live records");
            return Ok(FetchOutcome {
                records: live,
                provenance: DataProvenance::Live,
                live_records,
            });
        }

        warn!(
            records = live_records,
            minimum = self.min_live_records,
            "insufficient live data, supplementing with synthetic records"
        );
        let mut records = live;
        while records.len() < self.min_live_records {
            let synthetic = self.generator.generate()?;
            if synthetic.is_empty() {
                break;
            }
            records.extend(synthetic);
        }
        Ok(FetchOutcome {
            records,
            provenance: DataProvenance::Supplemented,
            live_records,
        })
    }
}

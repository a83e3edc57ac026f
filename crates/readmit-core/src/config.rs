//! Service configuration loaded from TOML.
//!
//! ```toml
//! [model]
//! bundle_path = "models/readmission.rdm"
//!
//! [data]
//! store = "data/store"
//! min_live_records = 100
//!
//! [data.synthetic]
//! seed = 42
//! samples = 2000
//!
//! [schedule]
//! poll_interval_secs = 60
//! retrain_interval_secs = 21600
//! cooldown_secs = 3600
//!
//! [training.ensemble]
//! seed = 42
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use readmit_ingest::{
    DataSourceAdapter, DocumentStore, LocalDocumentStore, MIN_LIVE_RECORDS, SyntheticConfig,
};

use crate::error::ConfigError;
use crate::manager::{ModelManager, TrainingConfig};
use crate::scheduler::ScheduleConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub bundle_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bundle_path: PathBuf::from("models/readmission.rdm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of a local document store. Without one, training is synthetic only.
    pub store: Option<PathBuf>,
    pub min_live_records: usize,
    pub synthetic: SyntheticConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            store: None,
            min_live_records: MIN_LIVE_RECORDS,
            synthetic: SyntheticConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    pub data: DataConfig,
    pub schedule: ScheduleConfig,
    pub training: TrainingConfig,
}

impl ServiceConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn adapter(&self) -> DataSourceAdapter {
        let store = self.data.store.as_ref().map(|root| {
            Arc::new(LocalDocumentStore::new(root.clone())) as Arc<dyn DocumentStore>
        });
        DataSourceAdapter::new(store, self.data.synthetic)
            .with_min_live_records(self.data.min_live_records)
    }

    /// A manager wired to the configured data source and bundle path.
    pub fn build_manager(&self) -> ModelManager {
        ModelManager::new(self.adapter(), self.training)
            .with_bundle_path(self.model.bundle_path.clone())
    }
}

//! Model lifecycle for 30-day readmission risk.
//!
//! - [`ModelManager`] runs training (fetch, clean, encode, fit, evaluate),
//!   persists the resulting [`ModelBundle`] and publishes it atomically.
//! - [`PredictionService`] scores requests against the published bundle.
//! - [`spawn_scheduler`] retrains in the background on a fixed cadence.
//! - [`ReadmissionService`] exposes all of it as request/response operations.
//!
//! Bundles are stored in a checksummed `RDM` container, see [`persistence`].

pub mod bundle;
pub mod config;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod prediction;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod test_support;

pub use bundle::{MODEL_TYPE, ModelBundle};
pub use config::{DataConfig, ModelConfig, ServiceConfig};
pub use error::{ConfigError, LockPoisoned, PredictionError, TrainingError};
pub use manager::{ModelManager, StartupSource, TrainingConfig, TrainingOutcome};
pub use persistence::{PersistenceError, load_bundle, save_bundle};
pub use prediction::{PredictionService, request_row};
pub use scheduler::{
    RetrainDecision, RetrainPolicy, ScheduleConfig, SchedulerHandle, spawn_scheduler,
};
pub use service::{Operation, ReadmissionService, ServiceRequest, ServiceResponse, Status};

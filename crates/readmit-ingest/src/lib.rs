//! Patient data sources.
//!
//! - [`DataSourceAdapter`] fetches training records from a live
//!   [`DocumentStore`] and falls back to a [`SyntheticGenerator`].
//! - [`BatchUploader`] pushes CSV-derived records into a store in retried batches.

pub mod adapter;
pub mod csv_source;
pub mod error;
pub mod local;
pub mod store;
pub mod synthetic;
pub mod upload;

pub use adapter::{DataProvenance, DataSourceAdapter, FetchOutcome, MIN_LIVE_RECORDS};
pub use csv_source::read_csv_records;
pub use error::{DataSourceError, Result};
pub use local::LocalDocumentStore;
pub use store::{DocumentStore, HospitalMetadata, MemoryDocumentStore, PatientDocument};
pub use synthetic::{SyntheticConfig, SyntheticGenerator, positive_rate};
pub use upload::{
    BatchUploader, HospitalTarget, Sleeper, ThreadSleeper, UploadConfig, UploadReport,
    document_id, sanitize_record,
};

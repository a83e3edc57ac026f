//! Durable storage of the published model bundle.

mod error;
mod format;
mod load;
mod save;

pub use error::{PersistenceError, Result};
pub use format::{CURRENT_SCHEMA_VERSION, MAGIC_BYTES, decode_bundle, encode_bundle};
pub use load::load_bundle;
pub use save::save_bundle;

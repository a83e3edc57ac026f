pub mod error;
pub mod fields;
pub mod indicators;
pub mod record;
pub mod risk;
pub mod stats;
pub mod value;

pub use error::{DataQualityError, Result};
pub use indicators::RiskIndicators;
pub use record::{CleanedRecord, FeatureRow, PatientRecord};
pub use risk::{PredictionResult, RiskTier, format_percent, round_to};
pub use value::{FieldValue, json_as_f64, parse_f64};

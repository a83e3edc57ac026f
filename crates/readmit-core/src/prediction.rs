//! Scoring a single prediction request against the published bundle.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use readmit_model::{FeatureRow, FieldValue, PatientRecord, PredictionResult, fields};

use crate::error::PredictionError;
use crate::manager::ModelManager;

/// `(request field, canonical field)` pairs accepted from clients.
pub const REQUEST_ALIASES: &[(&str, &str)] = &[
    ("diagnosis", fields::PRIMARY_DIAGNOSIS),
    ("num_medications", fields::NUM_MEDICATIONS),
    ("num_procedures", fields::PROCEDURES_COUNT),
    ("discharge_disposition", fields::DISCHARGE_LOCATION),
];

pub const EMERGENCY_FLAG: &str = "emergency_admission";

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() == Some(1.0),
        Value::String(text) => matches!(text.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Reconcile client field names and convert the request into a feature row.
///
/// Aliases only fill canonical fields the request leaves empty.
pub fn request_row(request: &PatientRecord) -> FeatureRow {
    let mut record = request.clone();
    for (alias, canonical) in REQUEST_ALIASES {
        if let Some(value) = record.remove(alias)
            && !record.has_value(canonical)
            && !value.is_null()
        {
            record.insert(*canonical, value);
        }
    }
    if let Some(flag) = record.remove(EMERGENCY_FLAG)
        && !record.has_value(fields::ADMISSION_TYPE)
    {
        let admission = if is_truthy(&flag) { "Emergency" } else { "Elective" };
        record.insert(fields::ADMISSION_TYPE, admission);
    }
    record
        .iter()
        .map(|(name, value)| (name.clone(), FieldValue::from_json(value)))
        .collect()
}

/// Read-only scorer. Never takes the training lock.
#[derive(Debug, Clone)]
pub struct PredictionService {
    manager: Arc<ModelManager>,
}

impl PredictionService {
    pub fn new(manager: Arc<ModelManager>) -> Self {
        Self { manager }
    }

    /// Score one request with the bundle published when the call starts.
    pub fn predict(&self, request: &PatientRecord) -> Result<PredictionResult, PredictionError> {
        if request.is_empty() {
            return Err(PredictionError::EmptyRequest);
        }
        let bundle = self.manager.current()?.ok_or(PredictionError::NoModel)?;

        let row = request_row(request);
        let probability = bundle.probability(&row);
        let disease = row
            .get(fields::PRIMARY_DIAGNOSIS)
            .and_then(FieldValue::as_text)
            .unwrap_or_else(|| fields::UNKNOWN_CATEGORY.to_string());
        debug!(probability, %disease, "scored prediction request");

        Ok(PredictionResult::new(
            probability,
            disease,
            bundle.accuracy(),
            bundle.trained_at(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> PatientRecord {
        PatientRecord::try_from(value).unwrap()
    }

    #[test]
    fn aliases_fill_canonical_fields() {
        let row = request_row(&record(json!({
            "diagnosis": "COPD",
            "num_medications": 12,
            "num_procedures": "2",
            "discharge_disposition": "Home",
        })));
        assert_eq!(row.get("primary_diagnosis"), Some(&FieldValue::Text("COPD".into())));
        assert_eq!(row.get("num_medications_prescribed"), Some(&FieldValue::Number(12.0)));
        assert_eq!(row.get("procedures_count"), Some(&FieldValue::Text("2".into())));
        assert_eq!(row.get("discharge_location"), Some(&FieldValue::Text("Home".into())));
        assert!(!row.contains_key("diagnosis"));
    }

    #[test]
    fn canonical_field_wins_over_alias() {
        let row = request_row(&record(json!({
            "diagnosis": "COPD",
            "primary_diagnosis": "Stroke",
        })));
        assert_eq!(row.get("primary_diagnosis"), Some(&FieldValue::Text("Stroke".into())));
    }

    #[test]
    fn emergency_flag_sets_admission_type() {
        for flag in [json!(1), json!("1"), json!(true)] {
            let row = request_row(&record(json!({ "emergency_admission": flag })));
            assert_eq!(row.get("admission_type"), Some(&FieldValue::Text("Emergency".into())));
        }
        for flag in [json!(0), json!("0"), json!(false), json!(null)] {
            let row = request_row(&record(json!({ "emergency_admission": flag })));
            assert_eq!(row.get("admission_type"), Some(&FieldValue::Text("Elective".into())));
        }
        let row = request_row(&record(json!({
            "emergency_admission": 1,
            "admission_type": "Urgent",
        })));
        assert_eq!(row.get("admission_type"), Some(&FieldValue::Text("Urgent".into())));
        assert!(!row.contains_key("emergency_admission"));
    }
}

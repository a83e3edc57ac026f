use std::collections::BTreeMap;

use proptest::prelude::*;
use readmit_model::{CleanedRecord, FieldValue, PatientRecord, fields};
use serde_json::json;

fn cleaned() -> CleanedRecord {
    let mut extra = BTreeMap::new();
    extra.insert("bmi".to_string(), FieldValue::Number(27.5));
    extra.insert("insurance".to_string(), FieldValue::Missing);
    CleanedRecord {
        age: 72.0,
        length_of_stay: 6.0,
        num_medications_prescribed: 9.0,
        procedures_count: 2.0,
        gender: "Female".to_string(),
        primary_diagnosis: "COPD".to_string(),
        admission_type: "Emergency".to_string(),
        discharge_location: "SNF".to_string(),
        readmitted_30_days: 1,
        extra,
    }
}

#[test]
fn patient_record_deserializes_from_object() {
    let record: PatientRecord =
        serde_json::from_value(json!({"age": "81", "gender": null, "name": "A"})).unwrap();
    assert_eq!(record.field("age").as_number(), Some(81.0));
    assert!(!record.has_value("gender"));
    assert!(record.has_value("name"));
    assert!(!record.is_blank());
}

#[test]
fn blank_record_detection() {
    let record: PatientRecord =
        serde_json::from_value(json!({"age": null, "gender": "  "})).unwrap();
    assert!(record.is_blank());
    assert!(PatientRecord::new().is_blank());
}

#[test]
fn non_object_json_is_rejected() {
    assert!(PatientRecord::try_from(json!([1, 2])).is_err());
    assert!(PatientRecord::try_from(json!({"a": 1})).is_ok());
}

#[test]
fn cleaned_record_row_contains_required_fields() {
    let row = cleaned().to_row();
    assert_eq!(row.get(fields::AGE), Some(&FieldValue::Number(72.0)));
    assert_eq!(
        row.get(fields::DISCHARGE_LOCATION),
        Some(&FieldValue::Text("SNF".to_string()))
    );
    assert_eq!(row.get(fields::TARGET), Some(&FieldValue::Number(1.0)));
    assert_eq!(row.get("bmi"), Some(&FieldValue::Number(27.5)));
    assert_eq!(cleaned().missing_extra_count(), 1);
}

#[test]
fn identifiers_are_recognized() {
    assert!(fields::is_identifier("patient_id"));
    assert!(fields::is_identifier("admission_date"));
    assert!(!fields::is_identifier("age"));
}

proptest! {
    #[test]
    fn numeric_strings_round_trip(n in -1.0e6f64..1.0e6) {
        let value = FieldValue::from(n.to_string());
        prop_assert_eq!(value.as_number(), Some(n));
    }
}

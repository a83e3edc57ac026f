//! Patient records before and after cleaning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields;
use crate::value::FieldValue;

/// A row keyed by column name, as consumed by the feature pipeline.
pub type FeatureRow = BTreeMap<String, FieldValue>;

/// Raw patient document as it arrives from a data source.
///
/// No schema is guaranteed: fields may be absent, null, or spelled with an alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientRecord(BTreeMap<String, Value>);

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Cell view of a field; absent keys read as missing.
    pub fn field(&self, key: &str) -> FieldValue {
        self.0.get(key).map_or(FieldValue::Missing, FieldValue::from_json)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// True if the key is present with a non-null, non-blank value.
    pub fn has_value(&self, key: &str) -> bool {
        !self.field(key).is_missing()
    }

    /// True if every field is missing.
    pub fn is_blank(&self) -> bool {
        self.0.values().all(|value| FieldValue::from_json(value).is_missing())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for PatientRecord {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for PatientRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Value> for PatientRecord {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(other),
        }
    }
}

/// A patient row that passed cleaning.
///
/// Required fields are always populated and within their documented bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub age: f64,
    pub length_of_stay: f64,
    pub num_medications_prescribed: f64,
    pub procedures_count: f64,
    pub gender: String,
    pub primary_diagnosis: String,
    pub admission_type: String,
    pub discharge_location: String,
    /// Binary target: 1 if the patient was readmitted within 30 days.
    pub readmitted_30_days: u8,
    /// Every other column carried over from the source document.
    pub extra: BTreeMap<String, FieldValue>,
}

impl CleanedRecord {
    /// Flatten into a row keyed by canonical column name, target included.
    pub fn to_row(&self) -> FeatureRow {
        let mut row = self.extra.clone();
        row.insert(fields::AGE.to_string(), FieldValue::Number(self.age));
        row.insert(
            fields::LENGTH_OF_STAY.to_string(),
            FieldValue::Number(self.length_of_stay),
        );
        row.insert(
            fields::NUM_MEDICATIONS.to_string(),
            FieldValue::Number(self.num_medications_prescribed),
        );
        row.insert(
            fields::PROCEDURES_COUNT.to_string(),
            FieldValue::Number(self.procedures_count),
        );
        row.insert(
            fields::GENDER.to_string(),
            FieldValue::Text(self.gender.clone()),
        );
        row.insert(
            fields::PRIMARY_DIAGNOSIS.to_string(),
            FieldValue::Text(self.primary_diagnosis.clone()),
        );
        row.insert(
            fields::ADMISSION_TYPE.to_string(),
            FieldValue::Text(self.admission_type.clone()),
        );
        row.insert(
            fields::DISCHARGE_LOCATION.to_string(),
            FieldValue::Text(self.discharge_location.clone()),
        );
        row.insert(
            fields::TARGET.to_string(),
            FieldValue::Number(f64::from(self.readmitted_30_days)),
        );
        row
    }

    pub fn is_positive(&self) -> bool {
        self.readmitted_30_days == 1
    }

    /// Count of carried-over columns that hold no value.
    pub fn missing_extra_count(&self) -> usize {
        self.extra.values().filter(|value| value.is_missing()).count()
    }
}

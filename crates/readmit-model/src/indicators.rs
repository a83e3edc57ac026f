//! Weighted readmission risk indicators.

use crate::fields;
use crate::record::PatientRecord;

/// Risk indicators used by both the synthetic label and the cleaning heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskIndicators {
    pub age: Option<f64>,
    pub length_of_stay: Option<f64>,
    pub medications: Option<f64>,
    pub procedures: Option<f64>,
    pub emergency_admission: Option<bool>,
    pub discharged_home: Option<bool>,
}

impl RiskIndicators {
    /// Weighted indicator score before noise. Absent indicators contribute nothing.
    pub fn score(&self) -> f64 {
        let mut score = 0.0;
        if let Some(age) = self.age {
            score += if age > 75.0 {
                0.4
            } else if age > 65.0 {
                0.25
            } else {
                0.1
            };
        }
        if let Some(los) = self.length_of_stay {
            score += if los > 10.0 {
                0.3
            } else if los > 5.0 {
                0.15
            } else {
                0.0
            };
        }
        if let Some(meds) = self.medications {
            score += if meds > 15.0 {
                0.25
            } else if meds > 8.0 {
                0.1
            } else {
                0.0
            };
        }
        if self.procedures.is_some_and(|procedures| procedures > 3.0) {
            score += 0.2;
        }
        if self.emergency_admission == Some(true) {
            score += 0.25;
        }
        if self.discharged_home == Some(false) {
            score += 0.15;
        }
        score
    }

    /// Read whichever indicators a raw record carries.
    pub fn from_record(record: &PatientRecord) -> Self {
        let text = |key: &str| record.field(key).as_text();
        Self {
            age: record.field(fields::AGE).as_number(),
            length_of_stay: record.field(fields::LENGTH_OF_STAY).as_number(),
            medications: record.field(fields::NUM_MEDICATIONS).as_number(),
            procedures: record.field(fields::PROCEDURES_COUNT).as_number(),
            emergency_admission: text(fields::ADMISSION_TYPE)
                .map(|value| value.eq_ignore_ascii_case("Emergency")),
            discharged_home: text(fields::DISCHARGE_LOCATION)
                .map(|value| value.eq_ignore_ascii_case("Home")),
        }
    }

    /// True if at least one indicator is known.
    pub fn any_known(&self) -> bool {
        self.age.is_some()
            || self.length_of_stay.is_some()
            || self.medications.is_some()
            || self.procedures.is_some()
            || self.emergency_admission.is_some()
            || self.discharged_home.is_some()
    }
}

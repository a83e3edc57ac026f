//! Field-name aliases seen in hospital exports.

use readmit_model::{PatientRecord, fields};

/// `(alias, canonical)` pairs. An alias only fills a canonical field that has no value.
pub const FIELD_ALIASES: &[(&str, &str)] = &[
    ("name", fields::PATIENT_NAME),
    ("diagnosis", fields::PRIMARY_DIAGNOSIS),
    ("num_medications", fields::NUM_MEDICATIONS),
    ("medications", fields::NUM_MEDICATIONS),
    ("num_procedures", fields::PROCEDURES_COUNT),
    ("discharge_disposition", fields::DISCHARGE_LOCATION),
    ("readmission", fields::TARGET),
];

/// Probability-like columns, checked in order.
pub const PROBABILITY_COLUMNS: &[&str] = &["readmission_probability", "readmission_risk_score"];

/// Categorical risk-level columns, checked in order.
pub const RISK_LEVEL_COLUMNS: &[&str] = &["risk_level", "riskLevel"];

/// Copy alias values onto canonical names and remove the alias columns.
///
/// Risk-score columns are left in place for target derivation.
pub fn apply_aliases(record: &mut PatientRecord) {
    for (alias, canonical) in FIELD_ALIASES {
        let Some(value) = record.remove(alias) else {
            continue;
        };
        if !record.has_value(canonical) && !value.is_null() {
            record.insert(*canonical, value);
        }
    }
}

/// Drop the columns that encode the label, so they never become features.
pub fn strip_target_proxies(record: &mut PatientRecord) {
    for column in PROBABILITY_COLUMNS.iter().chain(RISK_LEVEL_COLUMNS) {
        record.remove(column);
    }
}

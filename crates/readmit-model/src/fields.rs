//! Canonical column names.

pub const TARGET: &str = "readmitted_30_days";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const PRIMARY_DIAGNOSIS: &str = "primary_diagnosis";
pub const LENGTH_OF_STAY: &str = "length_of_stay";
pub const NUM_MEDICATIONS: &str = "num_medications_prescribed";
pub const PROCEDURES_COUNT: &str = "procedures_count";
pub const ADMISSION_TYPE: &str = "admission_type";
pub const DISCHARGE_LOCATION: &str = "discharge_location";
pub const PATIENT_ID: &str = "patient_id";
pub const PATIENT_NAME: &str = "patient_name";
pub const HOSPITAL_ID: &str = "hospital_id";

/// Columns that identify a patient or a point in time and never become features.
pub const IDENTIFIER_COLUMNS: &[&str] = &[
    "patient_name",
    "patient_id",
    "id",
    "hospital_id",
    "created_at",
    "last_updated",
    "admission_date",
];

/// Disease-specific parameters that are text-valued.
pub const DISEASE_TEXT_PARAMS: &[&str] = &["chest_pain_type", "exercise_angina"];

/// Disease-specific parameters that are numeric.
pub const DISEASE_NUMERIC_PARAMS: &[&str] = &[
    "resting_bp",
    "cholesterol",
    "max_heart_rate",
    "st_depression",
    "blood_glucose",
    "hba1c",
    "bmi",
];

/// Category used for categorical cells that carry no value.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

pub fn is_identifier(column: &str) -> bool {
    IDENTIFIER_COLUMNS.contains(&column)
}

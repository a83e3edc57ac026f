//! Required fields with their defaults and bounds.

use readmit_model::fields;

/// A numeric field every cleaned record carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericField {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericField {
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// A categorical field every cleaned record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoricalField {
    pub name: &'static str,
    pub default: &'static str,
}

pub const AGE: NumericField = NumericField {
    name: fields::AGE,
    default: 65.0,
    min: 0.0,
    max: 120.0,
};

pub const LENGTH_OF_STAY: NumericField = NumericField {
    name: fields::LENGTH_OF_STAY,
    default: 3.0,
    min: 0.0,
    max: 365.0,
};

pub const MEDICATIONS: NumericField = NumericField {
    name: fields::NUM_MEDICATIONS,
    default: 5.0,
    min: 0.0,
    max: 50.0,
};

pub const PROCEDURES: NumericField = NumericField {
    name: fields::PROCEDURES_COUNT,
    default: 1.0,
    min: 0.0,
    max: 20.0,
};

pub const NUMERIC_FIELDS: [NumericField; 4] = [AGE, LENGTH_OF_STAY, MEDICATIONS, PROCEDURES];

pub const CATEGORICAL_FIELDS: [CategoricalField; 4] = [
    CategoricalField {
        name: fields::GENDER,
        default: "Male",
    },
    CategoricalField {
        name: fields::PRIMARY_DIAGNOSIS,
        default: "Other",
    },
    CategoricalField {
        name: fields::ADMISSION_TYPE,
        default: "Elective",
    },
    CategoricalField {
        name: fields::DISCHARGE_LOCATION,
        default: "Home",
    },
];

pub fn is_required(name: &str) -> bool {
    NUMERIC_FIELDS.iter().any(|field| field.name == name)
        || CATEGORICAL_FIELDS.iter().any(|field| field.name == name)
}

//! Scalar cell values shared by the cleaning and feature stages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cell of a patient row after it has left the raw JSON document.
///
/// Numbers are always finite; `NaN`/`inf` inputs collapse to [`FieldValue::Missing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl FieldValue {
    /// Convert a raw JSON value into a cell.
    ///
    /// Booleans become `1`/`0`, blank strings become missing, nested values
    /// are kept as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::Bool(flag) => Self::Number(if *flag { 1.0 } else { 0.0 }),
            Value::Number(number) => match number.as_f64() {
                Some(n) if n.is_finite() => Self::Number(n),
                _ => Self::Missing,
            },
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Self::Missing
                } else {
                    Self::Text(trimmed.to_string())
                }
            }
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the cell. Text that parses as a finite number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => parse_f64(text),
            Self::Missing => None,
        }
    }

    /// Text view of the cell. Numbers render without a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(text) => Some(text.clone()),
            Self::Missing => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(text) => Value::String(text.clone()),
            Self::Missing => Value::Null,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Self::Number(value)
        } else {
            Self::Missing
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::from_json(&Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::from_json(&Value::String(value))
    }
}

/// Parse a trimmed string as a finite `f64`.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric view of a raw JSON value, using the same rules as [`FieldValue::as_number`].
pub fn json_as_f64(value: &Value) -> Option<f64> {
    FieldValue::from_json(value).as_number()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

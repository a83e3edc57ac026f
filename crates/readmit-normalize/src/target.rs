//! Readmission label derivation.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use readmit_model::{FieldValue, PatientRecord, RiskIndicators, fields};

use crate::aliases::{PROBABILITY_COLUMNS, RISK_LEVEL_COLUMNS};

/// Threshold applied to probability columns and to the heuristic score.
pub const LABEL_THRESHOLD: f64 = 0.5;

/// Half-width of the uniform noise added to the heuristic score.
pub const HEURISTIC_NOISE: f64 = 0.1;

/// Which rule produced a record's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    Explicit,
    Probability,
    RiskLevel,
    Heuristic,
    Default,
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::Probability => "probability",
            Self::RiskLevel => "risk_level",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        })
    }
}

/// Map a free-text risk level to a binary label.
///
/// Low and medium map to 0; high, very high and critical map to 1, with or
/// without a trailing "Risk". Anything else maps to 0.
pub fn risk_level_label(level: &str) -> u8 {
    let lowered = level.trim().to_ascii_lowercase();
    let base = lowered
        .strip_suffix("risk")
        .map_or(lowered.as_str(), str::trim_end);
    match base {
        "high" | "very high" | "critical" => 1,
        _ => 0,
    }
}

fn coerce_binary(value: &FieldValue) -> u8 {
    match value.as_number() {
        Some(n) => u8::from(n != 0.0),
        None => 0,
    }
}

/// Derive the label for one aliased record. First matching rule wins.
pub fn derive_target(record: &PatientRecord, rng: &mut impl Rng) -> (u8, TargetSource) {
    let explicit = record.field(fields::TARGET);
    if !explicit.is_missing() {
        return (coerce_binary(&explicit), TargetSource::Explicit);
    }

    for column in PROBABILITY_COLUMNS {
        if let Some(probability) = record.field(column).as_number() {
            return (u8::from(probability > LABEL_THRESHOLD), TargetSource::Probability);
        }
    }

    for column in RISK_LEVEL_COLUMNS {
        if let Some(level) = record.field(column).as_text() {
            return (risk_level_label(&level), TargetSource::RiskLevel);
        }
    }

    let indicators = RiskIndicators::from_record(record);
    if indicators.any_known() {
        let noise = rng.gen_range(-HEURISTIC_NOISE..HEURISTIC_NOISE);
        let label = u8::from(indicators.score() + noise > LABEL_THRESHOLD);
        return (label, TargetSource::Heuristic);
    }

    (0, TargetSource::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn derive(value: serde_json::Value) -> (u8, TargetSource) {
        let record = PatientRecord::try_from(value).unwrap();
        derive_target(&record, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn explicit_target_wins() {
        assert_eq!(
            derive(json!({"readmitted_30_days": "1", "risk_level": "Low"})),
            (1, TargetSource::Explicit)
        );
        assert_eq!(
            derive(json!({"readmitted_30_days": "yes"})),
            (0, TargetSource::Explicit)
        );
    }

    #[test]
    fn probability_is_thresholded_strictly() {
        assert_eq!(
            derive(json!({"readmission_probability": 0.5})),
            (0, TargetSource::Probability)
        );
        assert_eq!(
            derive(json!({"readmission_risk_score": "0.51"})),
            (1, TargetSource::Probability)
        );
    }

    #[test]
    fn risk_levels_map_through_table() {
        assert_eq!(risk_level_label("High Risk"), 1);
        assert_eq!(risk_level_label("very high"), 1);
        assert_eq!(risk_level_label("Critical Risk"), 1);
        assert_eq!(risk_level_label("Medium"), 0);
        assert_eq!(risk_level_label("low risk"), 0);
        assert_eq!(risk_level_label("unclear"), 0);
        assert_eq!(derive(json!({"riskLevel": "Critical"})), (1, TargetSource::RiskLevel));
    }

    #[test]
    fn heuristic_uses_available_indicators() {
        let (label, source) = derive(json!({
            "age": 82,
            "length_of_stay": 12,
            "admission_type": "Emergency",
        }));
        assert_eq!(source, TargetSource::Heuristic);
        assert_eq!(label, 1);

        let (label, _) = derive(json!({"age": 30, "length_of_stay": 1}));
        assert_eq!(label, 0);
    }

    #[test]
    fn nothing_known_defaults_to_zero() {
        assert_eq!(derive(json!({"gender": "Male"})), (0, TargetSource::Default));
    }
}

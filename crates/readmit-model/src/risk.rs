//! Risk tiers and the per-request prediction result.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered risk buckets derived from the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Critical,
}

impl RiskTier {
    /// Lower bounds are inclusive.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.85 {
            Self::Critical
        } else if probability >= 0.70 {
            Self::VeryHigh
        } else if probability >= 0.50 {
            Self::High
        } else if probability >= 0.30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Critical => "Critical",
        }
    }

    /// Care-plan sentence shown alongside the tier.
    pub fn status_message(self) -> &'static str {
        match self {
            Self::Critical => "Critical Risk - Immediate Intervention Required",
            Self::VeryHigh => "Very High Risk - Close Monitoring Required",
            Self::High => "High Risk - Enhanced Care Plan Needed",
            Self::Medium => "Medium Risk - Standard Follow-up",
            Self::Low => "Low Risk - Routine Care",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of scoring one patient against a published model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class probability rounded to three decimals.
    pub probability: f64,
    pub prediction: u8,
    pub risk: RiskTier,
    pub disease_type: String,
    pub model_accuracy: f64,
    pub trained_at: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(
        raw_probability: f64,
        disease_type: impl Into<String>,
        model_accuracy: f64,
        trained_at: DateTime<Utc>,
    ) -> Self {
        let probability = round_to(raw_probability.clamp(0.0, 1.0), 3);
        Self {
            probability,
            prediction: u8::from(raw_probability > 0.5),
            risk: RiskTier::from_probability(raw_probability),
            disease_type: disease_type.into(),
            model_accuracy,
            trained_at,
        }
    }

    /// Probability as a percentage string, e.g. `"73.4%"`.
    pub fn confidence(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }

    pub fn status(&self) -> &'static str {
        self.risk.status_message()
    }
}

/// Round half away from zero to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Format a ratio in `[0,1]` as a percentage with `decimals` places.
pub fn format_percent(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

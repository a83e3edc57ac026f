//! Equal-weight soft voting over the four base learners.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::boosting::{BoostingConfig, GradientBoosting};
use crate::error::{EnsembleError, Result};
use crate::forest::{Forest, ForestConfig, extra_trees_table};
use crate::logistic::{LogisticConfig, LogisticRegression};

/// Anything that scores a feature vector with a positive-class probability.
pub trait ProbabilisticClassifier {
    fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64;

    fn predict_proba_matrix(&self, matrix: &Array2<f64>) -> Vec<f64> {
        matrix.rows().into_iter().map(|row| self.predict_proba(row)).collect()
    }

    /// Class at the 0.5 cut-off.
    fn predict(&self, row: ArrayView1<'_, f64>) -> u8 {
        u8::from(self.predict_proba(row) > 0.5)
    }
}

/// Hyperparameters for every member plus the shared seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub seed: u64,
    pub logistic: LogisticConfig,
    pub random_forest: ForestConfig,
    pub gradient_boosting: BoostingConfig,
    #[serde(deserialize_with = "extra_trees_table")]
    pub extra_trees: ForestConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            logistic: LogisticConfig::default(),
            random_forest: ForestConfig::random_forest(),
            gradient_boosting: BoostingConfig::default(),
            extra_trees: ForestConfig::extra_trees(),
        }
    }
}

impl EnsembleConfig {
    /// Smaller forests and fewer boosting stages, for quick runs.
    pub fn fast() -> Self {
        let defaults = Self::default();
        Self {
            random_forest: ForestConfig {
                n_trees: 15,
                ..defaults.random_forest
            },
            gradient_boosting: BoostingConfig {
                n_stages: 15,
                max_depth: 3,
                ..defaults.gradient_boosting
            },
            extra_trees: ForestConfig {
                n_trees: 15,
                ..defaults.extra_trees
            },
            ..defaults
        }
    }
}

/// One fitted base learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Member {
    LogisticRegression(LogisticRegression),
    RandomForest(Forest),
    GradientBoosting(GradientBoosting),
    ExtraTrees(Forest),
}

impl Member {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "Logistic Regression",
            Self::RandomForest(_) => "Random Forest",
            Self::GradientBoosting(_) => "Gradient Boosting",
            Self::ExtraTrees(_) => "Extra Trees",
        }
    }
}

impl ProbabilisticClassifier for Member {
    fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            Self::LogisticRegression(model) => model.predict_proba(row),
            Self::RandomForest(model) | Self::ExtraTrees(model) => model.predict_proba(row),
            Self::GradientBoosting(model) => model.predict_proba(row),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    members: Vec<Member>,
    n_features: usize,
}

impl SoftVotingEnsemble {
    /// Fit all members on the same matrix. Labels must be 0/1 and contain both classes.
    pub fn fit(config: &EnsembleConfig, matrix: &Array2<f64>, labels: &[u8]) -> Result<Self> {
        let (rows, n_features) = matrix.dim();
        if rows == 0 || n_features == 0 {
            return Err(EnsembleError::EmptyInput);
        }
        if rows != labels.len() {
            return Err(EnsembleError::ShapeMismatch {
                rows,
                labels: labels.len(),
            });
        }
        if let Some(bad) = labels.iter().find(|&&label| label > 1) {
            return Err(EnsembleError::InvalidConfig(format!("label {bad} is not binary")));
        }
        crate::split::require_both_classes(labels, 1)?;

        let _span = info_span!("fit_ensemble", rows, features = n_features).entered();
        let seed = config.seed;
        let (logistic, (forest, (boosted, extra))) = rayon::join(
            || LogisticRegression::fit(&config.logistic, matrix, labels),
            || {
                rayon::join(
                    || Forest::fit(&config.random_forest, matrix, labels, seed),
                    || {
                        rayon::join(
                            || GradientBoosting::fit(&config.gradient_boosting, matrix, labels, seed),
                            || Forest::fit(&config.extra_trees, matrix, labels, seed.wrapping_add(10_000)),
                        )
                    },
                )
            },
        );
        debug!(logistic_iterations = logistic.iterations(), "ensemble members fitted");

        Ok(Self {
            members: vec![
                Member::LogisticRegression(logistic),
                Member::RandomForest(forest),
                Member::GradientBoosting(boosted),
                Member::ExtraTrees(extra),
            ],
            n_features,
        })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn algorithm_names(&self) -> Vec<&'static str> {
        self.members.iter().map(Member::name).collect()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl ProbabilisticClassifier for SoftVotingEnsemble {
    fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.members.is_empty() {
            return 0.5;
        }
        let total: f64 = self.members.iter().map(|member| member.predict_proba(row)).sum();
        (total / self.members.len() as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_mismatched_labels() {
        let matrix = array![[1.0], [2.0]];
        let error = SoftVotingEnsemble::fit(&EnsembleConfig::fast(), &matrix, &[0]).unwrap_err();
        assert_eq!(error, EnsembleError::ShapeMismatch { rows: 2, labels: 1 });
    }

    #[test]
    fn rejects_empty_matrix() {
        let matrix = Array2::<f64>::zeros((0, 3));
        let error = SoftVotingEnsemble::fit(&EnsembleConfig::fast(), &matrix, &[]).unwrap_err();
        assert_eq!(error, EnsembleError::EmptyInput);
    }

    #[test]
    fn averages_four_members() {
        let matrix = array![[0.0], [1.0], [2.0], [3.0], [7.0], [8.0], [9.0], [10.0]];
        let labels = [0, 0, 0, 0, 1, 1, 1, 1];
        let ensemble = SoftVotingEnsemble::fit(&EnsembleConfig::fast(), &matrix, &labels).unwrap();
        assert_eq!(
            ensemble.algorithm_names(),
            ["Logistic Regression", "Random Forest", "Gradient Boosting", "Extra Trees"]
        );
        let row = array![9.5];
        let mean = ensemble
            .members()
            .iter()
            .map(|member| member.predict_proba(row.view()))
            .sum::<f64>()
            / 4.0;
        assert!((ensemble.predict_proba(row.view()) - mean).abs() < 1e-12);
        assert_eq!(ensemble.predict(row.view()), 1);
        assert_eq!(ensemble.predict(array![0.5].view()), 0);
    }

    #[test]
    fn extra_trees_keys_default_to_extra_trees_preset() {
        let config: EnsembleConfig =
            serde_json::from_str(r#"{"extra_trees": {"n_trees": 40}}"#).unwrap();
        assert_eq!(config.extra_trees.n_trees, 40);
        assert_eq!(config.extra_trees.splitter, crate::tree::Splitter::Random);
        assert!(!config.extra_trees.bootstrap);
        assert_eq!(config.extra_trees.max_depth, Some(8));
        assert_eq!(config.random_forest, ForestConfig::random_forest());

        let unbounded = EnsembleConfig {
            extra_trees: ForestConfig {
                max_depth: None,
                ..ForestConfig::extra_trees()
            },
            ..EnsembleConfig::default()
        };
        let text = serde_json::to_string(&unbounded).unwrap();
        assert_eq!(serde_json::from_str::<EnsembleConfig>(&text).unwrap(), unbounded);
    }
}

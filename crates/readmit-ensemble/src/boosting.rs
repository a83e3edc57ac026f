//! Gradient-boosted regression trees on the binomial log-loss.

use ndarray::{Array2, ArrayView1};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::logistic::sigmoid;
use crate::tree::{DecisionTree, LeafRule, MaxFeatures, Splitter, TreeConfig, TreeData};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_stages: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows drawn without replacement for each stage.
    pub subsample: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_stages: 100,
            learning_rate: 0.1,
            max_depth: 6,
            subsample: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Log-odds of the positive class before any stage.
    baseline: f64,
    learning_rate: f64,
    stages: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn fit(config: &BoostingConfig, matrix: &Array2<f64>, labels: &[u8], seed: u64) -> Self {
        let n = matrix.nrows();
        let targets: Vec<f64> = labels.iter().map(|&label| f64::from(label)).collect();
        let positive_rate = if n == 0 {
            0.5
        } else {
            (targets.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6)
        };
        let baseline = (positive_rate / (1.0 - positive_rate)).ln();

        let tree_config = TreeConfig {
            max_depth: Some(config.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            splitter: Splitter::Best,
        };
        let subsample_size = ((n as f64 * config.subsample.clamp(0.0, 1.0)).round() as usize).clamp(1.min(n), n);
        let unit_weights = vec![1.0; n];
        let mut scores = vec![baseline; n];
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stages = Vec::with_capacity(config.n_stages);

        for _ in 0..config.n_stages {
            let probabilities: Vec<f64> = scores.iter().map(|&score| sigmoid(score)).collect();
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&probabilities)
                .map(|(y, p)| y - p)
                .collect();
            let hessians: Vec<f64> = probabilities.iter().map(|p| p * (1.0 - p)).collect();
            let mut samples = index::sample(&mut rng, n, subsample_size).into_vec();
            samples.sort_unstable();

            let data = TreeData {
                matrix,
                targets: &residuals,
                weights: &unit_weights,
                leaf: LeafRule::Newton { hessians: &hessians },
            };
            let tree = DecisionTree::fit(&tree_config, &data, &samples, &mut rng);
            for (i, score) in scores.iter_mut().enumerate() {
                *score += config.learning_rate * tree.predict(matrix.row(i));
            }
            stages.push(tree);
        }

        Self {
            baseline,
            learning_rate: config.learning_rate,
            stages,
        }
    }

    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.baseline
            + self
                .stages
                .iter()
                .map(|tree| self.learning_rate * tree.predict(row))
                .sum::<f64>()
    }

    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.decision_function(row))
    }

    pub fn stages(&self) -> usize {
        self.stages.len()
    }
}

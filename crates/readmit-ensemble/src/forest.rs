//! Bagged tree ensembles: random forest and extremely randomised trees.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

use crate::tree::{DecisionTree, LeafRule, MaxFeatures, Splitter, TreeConfig, TreeData};
use crate::weights::sample_weights;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub splitter: Splitter,
    pub bootstrap: bool,
    pub balanced: bool,
}

impl ForestConfig {
    pub fn random_forest() -> Self {
        Self {
            n_trees: 150,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            splitter: Splitter::Best,
            bootstrap: true,
            balanced: true,
        }
    }

    pub fn extra_trees() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(8),
            min_samples_split: 5,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            splitter: Splitter::Random,
            bootstrap: false,
            balanced: true,
        }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            splitter: self.splitter,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::random_forest()
    }
}

/// Keys present in a forest table; absent keys keep the base preset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForestOverrides {
    n_trees: Option<usize>,
    /// `null` is an explicit unbounded depth, not an unset key.
    #[serde(deserialize_with = "present")]
    max_depth: Option<Option<usize>>,
    min_samples_split: Option<usize>,
    min_samples_leaf: Option<usize>,
    max_features: Option<MaxFeatures>,
    splitter: Option<Splitter>,
    bootstrap: Option<bool>,
    balanced: Option<bool>,
}

impl ForestOverrides {
    fn apply(self, base: ForestConfig) -> ForestConfig {
        ForestConfig {
            n_trees: self.n_trees.unwrap_or(base.n_trees),
            max_depth: self.max_depth.unwrap_or(base.max_depth),
            min_samples_split: self.min_samples_split.unwrap_or(base.min_samples_split),
            min_samples_leaf: self.min_samples_leaf.unwrap_or(base.min_samples_leaf),
            max_features: self.max_features.unwrap_or(base.max_features),
            splitter: self.splitter.unwrap_or(base.splitter),
            bootstrap: self.bootstrap.unwrap_or(base.bootstrap),
            balanced: self.balanced.unwrap_or(base.balanced),
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<usize>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<usize>::deserialize(deserializer).map(Some)
}

/// Read an extra-trees table, filling unset keys from [`ForestConfig::extra_trees`].
pub(crate) fn extra_trees_table<'de, D>(deserializer: D) -> Result<ForestConfig, D::Error>
where
    D: Deserializer<'de>,
{
    ForestOverrides::deserialize(deserializer)
        .map(|overrides| overrides.apply(ForestConfig::extra_trees()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
}

impl Forest {
    /// Fit `n_trees` trees in parallel. Tree `t` draws from its own generator
    /// seeded with `seed + t`, so the result does not depend on thread scheduling.
    pub fn fit(config: &ForestConfig, matrix: &Array2<f64>, labels: &[u8], seed: u64) -> Self {
        let n = matrix.nrows();
        let targets: Vec<f64> = labels.iter().map(|&label| f64::from(label)).collect();
        let weights = sample_weights(labels, config.balanced);
        let data = TreeData {
            matrix,
            targets: &targets,
            weights: &weights,
            leaf: LeafRule::Mean,
        };
        let tree_config = config.tree_config();

        let trees = (0..config.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let samples: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(&tree_config, &data, &samples, &mut rng)
            })
            .collect();
        Self { trees }
    }

    /// Mean of the per-tree positive-class probabilities.
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        (total / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> (Array2<f64>, Vec<u8>) {
        let matrix = array![
            [1.0, 0.2],
            [1.5, 0.1],
            [2.0, 0.4],
            [2.5, 0.3],
            [3.0, 0.2],
            [7.0, 0.3],
            [7.5, 0.1],
            [8.0, 0.2],
            [8.5, 0.4],
            [9.0, 0.3],
        ];
        (matrix, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1])
    }

    fn small(base: ForestConfig) -> ForestConfig {
        ForestConfig {
            n_trees: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..base
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let (matrix, labels) = sample();
        let config = small(ForestConfig::random_forest());
        assert_eq!(Forest::fit(&config, &matrix, &labels, 42), Forest::fit(&config, &matrix, &labels, 42));
    }

    #[test]
    fn random_forest_ranks_classes() {
        let (matrix, labels) = sample();
        let forest = Forest::fit(&small(ForestConfig::random_forest()), &matrix, &labels, 42);
        assert_eq!(forest.trees().len(), 12);
        let low = forest.predict_proba(array![1.2, 0.2].view());
        let high = forest.predict_proba(array![8.7, 0.2].view());
        assert!(low < high);
    }

    #[test]
    fn extra_trees_ranks_classes() {
        let (matrix, labels) = sample();
        let forest = Forest::fit(&small(ForestConfig::extra_trees()), &matrix, &labels, 42);
        let low = forest.predict_proba(array![1.2, 0.2].view());
        let high = forest.predict_proba(array![8.7, 0.2].view());
        assert!(low < high);
    }

    #[test]
    fn defaults_match_documented_settings() {
        let rf = ForestConfig::random_forest();
        assert_eq!((rf.n_trees, rf.max_depth, rf.min_samples_split, rf.min_samples_leaf), (150, Some(10), 5, 2));
        let et = ForestConfig::extra_trees();
        assert_eq!((et.n_trees, et.max_depth, et.min_samples_split), (100, Some(8), 5));
        assert!(!et.bootstrap);
    }
}

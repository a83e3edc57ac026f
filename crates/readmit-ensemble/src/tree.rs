//! Binary decision trees shared by the forest and boosting learners.
//!
//! Trees are grown on a weighted squared-error criterion. For 0/1 targets the
//! weighted Gini impurity of a node is exactly twice its weighted variance, so
//! the same criterion yields CART classification splits and regression splits
//! for boosting residuals.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Number of features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    /// `max(1, floor(sqrt(p)))`.
    Sqrt,
}

impl MaxFeatures {
    pub fn count(self, n_features: usize) -> usize {
        match self {
            Self::All => n_features,
            Self::Sqrt => ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1)),
        }
    }
}

/// Threshold search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Splitter {
    /// Every midpoint between distinct sorted values.
    Best,
    /// One uniformly drawn threshold per feature.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub splitter: Splitter,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            splitter: Splitter::Best,
        }
    }
}

/// How a leaf turns its samples into an output value.
#[derive(Debug, Clone, Copy)]
pub enum LeafRule<'a> {
    /// Weighted mean of the targets.
    Mean,
    /// `sum(target) / sum(hessian)`, the one-step Newton update for log-loss.
    Newton { hessians: &'a [f64] },
}

/// Training data for one tree. `targets` and `weights` are indexed by matrix row.
#[derive(Debug, Clone, Copy)]
pub struct TreeData<'a> {
    pub matrix: &'a Array2<f64>,
    pub targets: &'a [f64],
    pub weights: &'a [f64],
    pub leaf: LeafRule<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: usize,
    weight: f64,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn add(&mut self, target: f64, weight: f64) {
        self.count += 1;
        self.weight += weight;
        self.sum += weight * target;
        self.sum_sq += weight * target * target;
    }

    fn minus(self, other: Self) -> Self {
        Self {
            count: self.count - other.count,
            weight: self.weight - other.weight,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    /// Weighted sum of squared deviations from the weighted mean.
    fn impurity(self) -> f64 {
        if self.weight <= 0.0 {
            0.0
        } else {
            (self.sum_sq - self.sum * self.sum / self.weight).max(0.0)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// A fitted tree stored as a flat node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `samples`. Rows may repeat (bootstrap).
    pub fn fit<R: Rng>(config: &TreeConfig, data: &TreeData<'_>, samples: &[usize], rng: &mut R) -> Self {
        let mut builder = Builder {
            config,
            data,
            nodes: Vec::new(),
        };
        let mut samples = samples.to_vec();
        builder.grow(&mut samples, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Builder<'c, 'd> {
    config: &'c TreeConfig,
    data: &'c TreeData<'d>,
    nodes: Vec<Node>,
}

impl Builder<'_, '_> {
    fn grow<R: Rng>(&mut self, samples: &mut [usize], depth: usize, rng: &mut R) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(samples),
        });

        let moments = self.moments(samples.iter().copied());
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || samples.len() < self.config.min_samples_split.max(2)
            || moments.impurity() <= f64::EPSILON
        {
            return id;
        }
        let Some(split) = self.find_split(samples, moments, rng) else {
            return id;
        };

        let matrix = self.data.matrix;
        samples.sort_by_key(|&row| matrix[[row, split.feature]] > split.threshold);
        let mid = samples
            .iter()
            .take_while(|&&row| matrix[[row, split.feature]] <= split.threshold)
            .count();
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.grow(left_samples, depth + 1, rng);
        let right = self.grow(right_samples, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn moments(&self, samples: impl Iterator<Item = usize>) -> Moments {
        let mut moments = Moments::default();
        for row in samples {
            moments.add(self.data.targets[row], self.data.weights[row]);
        }
        moments
    }

    fn leaf_value(&self, samples: &[usize]) -> f64 {
        match self.data.leaf {
            LeafRule::Mean => {
                let moments = self.moments(samples.iter().copied());
                if moments.weight > 0.0 {
                    moments.sum / moments.weight
                } else {
                    0.0
                }
            }
            LeafRule::Newton { hessians } => {
                let numerator: f64 = samples.iter().map(|&row| self.data.targets[row]).sum();
                let denominator: f64 = samples.iter().map(|&row| hessians[row]).sum();
                if denominator.abs() < 1e-12 {
                    0.0
                } else {
                    numerator / denominator
                }
            }
        }
    }

    fn find_split<R: Rng>(&self, samples: &[usize], parent: Moments, rng: &mut R) -> Option<Candidate> {
        let n_features = self.data.matrix.ncols();
        if n_features == 0 {
            return None;
        }
        let wanted = self.config.max_features.count(n_features);
        let mut features = index::sample(rng, n_features, wanted).into_vec();
        features.sort_unstable();

        let mut best: Option<Candidate> = None;
        for feature in features {
            let candidate = match self.config.splitter {
                Splitter::Best => self.best_threshold(samples, feature, parent),
                Splitter::Random => self.random_threshold(samples, feature, parent, rng),
            };
            if let Some(candidate) = candidate
                && best.is_none_or(|current| candidate.impurity < current.impurity)
            {
                best = Some(candidate);
            }
        }
        best.filter(|candidate| parent.impurity() - candidate.impurity > 1e-12)
    }

    fn best_threshold(&self, samples: &[usize], feature: usize, parent: Moments) -> Option<Candidate> {
        let matrix = self.data.matrix;
        let mut ordered: Vec<(f64, usize)> = samples
            .iter()
            .map(|&row| (matrix[[row, feature]], row))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut left = Moments::default();
        let mut best: Option<Candidate> = None;
        for position in 0..ordered.len().saturating_sub(1) {
            let (value, row) = ordered[position];
            left.add(self.data.targets[row], self.data.weights[row]);
            let next = ordered[position + 1].0;
            if next <= value {
                continue;
            }
            let right = parent.minus(left);
            if left.count < min_leaf || right.count < min_leaf {
                continue;
            }
            let impurity = left.impurity() + right.impurity();
            if best.is_none_or(|current| impurity < current.impurity) {
                best = Some(Candidate {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    impurity,
                });
            }
        }
        best
    }

    fn random_threshold<R: Rng>(
        &self,
        samples: &[usize],
        feature: usize,
        parent: Moments,
        rng: &mut R,
    ) -> Option<Candidate> {
        let matrix = self.data.matrix;
        let (low, high) = samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &row| {
            let value = matrix[[row, feature]];
            (lo.min(value), hi.max(value))
        });
        if high <= low {
            return None;
        }
        let threshold = rng.gen_range(low..high);
        let left = self.moments(
            samples
                .iter()
                .copied()
                .filter(|&row| matrix[[row, feature]] <= threshold),
        );
        let right = parent.minus(left);
        let min_leaf = self.config.min_samples_leaf.max(1);
        if left.count < min_leaf || right.count < min_leaf {
            return None;
        }
        Some(Candidate {
            feature,
            threshold,
            impurity: left.impurity() + right.impurity(),
        })
    }
}

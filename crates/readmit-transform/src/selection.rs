//! ANOVA F-score feature scoring and top-k selection.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How many features survive selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode", content = "k")]
pub enum SelectionMode {
    /// Keep every feature.
    #[default]
    All,
    /// Keep the `k` highest-scoring features.
    TopK(usize),
}

/// One-way ANOVA F statistic of each column against the class labels.
///
/// Columns where the statistic is undefined (no within-class variance and no
/// between-class variance) score 0; a perfectly separating column scores
/// `f64::MAX`.
pub fn anova_f_scores(matrix: &Array2<f64>, labels: &[u8]) -> Vec<f64> {
    let n = matrix.nrows();
    let mut classes: Vec<u8> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let k = classes.len();
    if n <= k || k < 2 {
        return vec![0.0; matrix.ncols()];
    }

    matrix
        .columns()
        .into_iter()
        .map(|column| {
            let overall = column.sum() / n as f64;
            let mut ss_between = 0.0;
            let mut ss_within = 0.0;
            for &class in &classes {
                let values: Vec<f64> = column
                    .iter()
                    .zip(labels)
                    .filter(|(_, label)| **label == class)
                    .map(|(value, _)| *value)
                    .collect();
                let count = values.len() as f64;
                let class_mean = values.iter().sum::<f64>() / count;
                ss_between += count * (class_mean - overall).powi(2);
                ss_within += values
                    .iter()
                    .map(|value| (value - class_mean).powi(2))
                    .sum::<f64>();
            }
            let df_between = (k - 1) as f64;
            let df_within = (n - k) as f64;
            let f = (ss_between / df_between) / (ss_within / df_within);
            if f.is_nan() {
                0.0
            } else if f.is_infinite() {
                f64::MAX
            } else {
                f
            }
        })
        .collect()
}

/// Scores and the retained column indices, in ascending column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelector {
    mode: SelectionMode,
    scores: Vec<f64>,
    selected: Vec<usize>,
}

impl FeatureSelector {
    pub fn fit(matrix: &Array2<f64>, labels: &[u8], mode: SelectionMode) -> Self {
        let scores = anova_f_scores(matrix, labels);
        let selected = match mode {
            SelectionMode::All => (0..scores.len()).collect(),
            SelectionMode::TopK(k) => {
                let mut ranked: Vec<usize> = (0..scores.len()).collect();
                // Stable sort keeps lower column indices first among ties.
                ranked.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
                ranked.truncate(k.min(scores.len()));
                ranked.sort_unstable();
                ranked
            }
        };
        Self {
            mode,
            scores,
            selected,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn project(&self, matrix: &Array2<f64>) -> Array2<f64> {
        matrix.select(ndarray::Axis(1), &self.selected)
    }

    pub fn project_row(&self, row: &[f64]) -> Vec<f64> {
        self.selected.iter().map(|&index| row[index]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> (Array2<f64>, Vec<u8>) {
        let matrix = array![
            [1.0, 5.0, 3.0],
            [1.1, 5.0, 9.0],
            [0.9, 5.0, 1.0],
            [3.0, 5.0, 4.0],
            [3.2, 5.0, 8.0],
            [2.9, 5.0, 2.0],
        ];
        (matrix, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn separating_feature_scores_highest() {
        let (matrix, labels) = sample();
        let scores = anova_f_scores(&matrix, &labels);
        assert!(scores[0] > scores[2]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn all_mode_keeps_every_column() {
        let (matrix, labels) = sample();
        let selector = FeatureSelector::fit(&matrix, &labels, SelectionMode::All);
        assert_eq!(selector.selected(), [0, 1, 2]);
        assert_eq!(selector.project(&matrix), matrix);
    }

    #[test]
    fn top_k_keeps_best_in_column_order() {
        let (matrix, labels) = sample();
        let selector = FeatureSelector::fit(&matrix, &labels, SelectionMode::TopK(2));
        assert_eq!(selector.selected(), [0, 2]);
        assert_eq!(selector.project_row(&[7.0, 8.0, 9.0]), vec![7.0, 9.0]);
        assert_eq!(selector.project(&matrix).ncols(), 2);
    }

    #[test]
    fn single_class_scores_zero() {
        let (matrix, _) = sample();
        assert_eq!(anova_f_scores(&matrix, &[1; 6]), vec![0.0; 3]);
    }
}

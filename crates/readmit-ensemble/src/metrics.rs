//! Classification metrics.

use serde::{Deserialize, Serialize};

/// Held-out and cross-validated performance of a fitted ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub auc: f64,
    pub f1: f64,
    pub cv_mean: f64,
    /// Population standard deviation of the fold accuracies.
    pub cv_std: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

pub fn accuracy(labels: &[u8], predictions: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(predictions)
        .filter(|(label, prediction)| label == prediction)
        .count();
    correct as f64 / labels.len() as f64
}

/// F1 of the positive class; 0 when there are no true positives.
pub fn f1_score(labels: &[u8], predictions: &[u8]) -> f64 {
    let mut true_positive = 0usize;
    let mut false_positive = 0usize;
    let mut false_negative = 0usize;
    for (&label, &prediction) in labels.iter().zip(predictions) {
        match (label, prediction) {
            (1, 1) => true_positive += 1,
            (0, 1) => false_positive += 1,
            (1, 0) => false_negative += 1,
            _ => {}
        }
    }
    if true_positive == 0 {
        return 0.0;
    }
    let tp = true_positive as f64;
    2.0 * tp / (2.0 * tp + false_positive as f64 + false_negative as f64)
}

/// Area under the ROC curve via the Mann-Whitney rank statistic, with tied
/// scores sharing their average rank. `None` unless both classes are present.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|&&label| label == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tied block spans start+1 ..= end+1.
        let average = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = average;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = (0..n).filter(|&i| labels[i] == 1).map(|i| ranks[i]).sum();
    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

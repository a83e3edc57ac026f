//! Hold-out evaluation and cross-validation of the soft-voting ensemble.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::{ModelMetrics, accuracy, f1_score, mean_std, roc_auc};
use crate::split::{require_both_classes, stratified_folds, stratified_split};
use crate::voting::{EnsembleConfig, ProbabilisticClassifier, SoftVotingEnsemble};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
        }
    }
}

/// A fitted ensemble with the metrics measured while fitting it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model: SoftVotingEnsemble,
    pub metrics: ModelMetrics,
}

fn take(matrix: &Array2<f64>, labels: &[u8], rows: &[usize]) -> (Array2<f64>, Vec<u8>) {
    (
        matrix.select(Axis(0), rows),
        rows.iter().map(|&row| labels[row]).collect(),
    )
}

fn predictions(model: &SoftVotingEnsemble, matrix: &Array2<f64>) -> (Vec<f64>, Vec<u8>) {
    let probabilities = model.predict_proba_matrix(matrix);
    let classes = probabilities.iter().map(|&p| u8::from(p > 0.5)).collect();
    (probabilities, classes)
}

/// Split stratified, fit on the training side, score the held-out side, and
/// cross-validate accuracy on the training side.
pub fn fit_and_evaluate(
    ensemble: &EnsembleConfig,
    evaluation: &EvaluationConfig,
    matrix: &Array2<f64>,
    labels: &[u8],
) -> Result<Evaluation> {
    require_both_classes(labels, evaluation.cv_folds.max(2))?;

    let split = stratified_split(labels, evaluation.test_fraction, ensemble.seed);
    let (train_matrix, train_labels) = take(matrix, labels, &split.train);
    let (test_matrix, test_labels) = take(matrix, labels, &split.test);

    let model = SoftVotingEnsemble::fit(ensemble, &train_matrix, &train_labels)?;
    let (probabilities, classes) = predictions(&model, &test_matrix);
    let test_accuracy = accuracy(&test_labels, &classes);
    let auc = roc_auc(&test_labels, &probabilities).unwrap_or(0.5);
    let f1 = f1_score(&test_labels, &classes);

    let mut fold_scores = Vec::with_capacity(evaluation.cv_folds);
    for (fold, split) in stratified_folds(&train_labels, evaluation.cv_folds, ensemble.seed)
        .into_iter()
        .enumerate()
    {
        let (fold_matrix, fold_labels) = take(&train_matrix, &train_labels, &split.train);
        let (held_matrix, held_labels) = take(&train_matrix, &train_labels, &split.test);
        let fold_model = SoftVotingEnsemble::fit(ensemble, &fold_matrix, &fold_labels)?;
        let (_, fold_classes) = predictions(&fold_model, &held_matrix);
        let score = accuracy(&held_labels, &fold_classes);
        debug!(fold, score, "cross-validation fold");
        fold_scores.push(score);
    }
    let (cv_mean, cv_std) = mean_std(&fold_scores);

    let metrics = ModelMetrics {
        accuracy: test_accuracy,
        auc,
        f1,
        cv_mean,
        cv_std,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    };
    info!(
        accuracy = metrics.accuracy,
        auc = metrics.auc,
        f1 = metrics.f1,
        cv_mean = metrics.cv_mean,
        cv_std = metrics.cv_std,
        "ensemble evaluated"
    );
    Ok(Evaluation { model, metrics })
}

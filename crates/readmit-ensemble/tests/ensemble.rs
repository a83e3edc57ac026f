//! Fitting and evaluating the full ensemble on a learnable dataset.

use ndarray::Array2;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use readmit_ensemble::{
    EnsembleConfig, EnsembleError, EvaluationConfig, ProbabilisticClassifier, SoftVotingEnsemble,
    fit_and_evaluate, roc_auc,
};
use readmit_model::DataQualityError;

/// Two informative columns and one noise column; the label follows a noisy linear rule.
fn dataset(rows: usize, seed: u64) -> (Array2<f64>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut matrix = Array2::<f64>::zeros((rows, 3));
    let mut labels = Vec::with_capacity(rows);
    for i in 0..rows {
        let a: f64 = rng.gen_range(-2.0..2.0);
        let b: f64 = rng.gen_range(-2.0..2.0);
        let noise: f64 = rng.gen_range(-1.0..1.0);
        matrix[[i, 0]] = a;
        matrix[[i, 1]] = b;
        matrix[[i, 2]] = noise;
        labels.push(u8::from(a + 0.5 * b + 0.3 * rng.gen_range(-1.0f64..1.0) > 0.0));
    }
    (matrix, labels)
}

#[test]
fn ensemble_learns_a_linear_rule() {
    let (matrix, labels) = dataset(300, 11);
    let evaluation = fit_and_evaluate(
        &EnsembleConfig::fast(),
        &EvaluationConfig::default(),
        &matrix,
        &labels,
    )
    .unwrap();
    let metrics = evaluation.metrics;
    assert_eq!(metrics.test_rows + metrics.train_rows, 300);
    assert!(metrics.accuracy > 0.8, "accuracy {}", metrics.accuracy);
    assert!(metrics.auc > 0.85, "auc {}", metrics.auc);
    assert!(metrics.cv_mean > 0.75, "cv {}", metrics.cv_mean);
    assert!(metrics.cv_std >= 0.0);
    assert!((0.0..=1.0).contains(&metrics.f1));
}

#[test]
fn evaluation_is_reproducible() {
    let (matrix, labels) = dataset(120, 5);
    let config = EnsembleConfig::fast();
    let first = fit_and_evaluate(&config, &EvaluationConfig::default(), &matrix, &labels).unwrap();
    let second = fit_and_evaluate(&config, &EvaluationConfig::default(), &matrix, &labels).unwrap();
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.model, second.model);
}

#[test]
fn single_class_target_is_a_data_error() {
    let (matrix, _) = dataset(40, 3);
    let labels = vec![0; 40];
    let error = fit_and_evaluate(
        &EnsembleConfig::fast(),
        &EvaluationConfig::default(),
        &matrix,
        &labels,
    )
    .unwrap_err();
    assert_eq!(error, EnsembleError::Data(DataQualityError::SingleClass(0)));
}

#[test]
fn serialized_model_predicts_identically() {
    let (matrix, labels) = dataset(100, 8);
    let model = SoftVotingEnsemble::fit(&EnsembleConfig::fast(), &matrix, &labels).unwrap();
    let json = serde_json::to_string(&model).unwrap();
    let restored: SoftVotingEnsemble = serde_json::from_str(&json).unwrap();
    assert_eq!(
        model.predict_proba_matrix(&matrix),
        restored.predict_proba_matrix(&matrix)
    );
    assert!(roc_auc(&labels, &model.predict_proba_matrix(&matrix)).unwrap() > 0.9);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn probabilities_stay_in_unit_interval(x in -50.0f64..50.0, y in -50.0f64..50.0, z in -50.0f64..50.0) {
        let (matrix, labels) = dataset(60, 2);
        let model = SoftVotingEnsemble::fit(&EnsembleConfig::fast(), &matrix, &labels).unwrap();
        let probability = model.predict_proba(ndarray::array![x, y, z].view());
        prop_assert!((0.0..=1.0).contains(&probability));
    }
}

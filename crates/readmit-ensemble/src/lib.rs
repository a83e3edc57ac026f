//! Soft-voting readmission classifier.
//!
//! Four base learners (logistic regression, random forest, gradient-boosted
//! trees and extremely randomised trees) are fitted on the same feature matrix
//! and their positive-class probabilities are averaged with equal weight.
//! Every source of randomness derives from [`EnsembleConfig::seed`].

pub mod boosting;
pub mod error;
pub mod evaluation;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod split;
pub mod tree;
pub mod voting;
pub mod weights;

pub use boosting::{BoostingConfig, GradientBoosting};
pub use error::{EnsembleError, Result};
pub use evaluation::{Evaluation, EvaluationConfig, fit_and_evaluate};
pub use forest::{Forest, ForestConfig};
pub use logistic::{LogisticConfig, LogisticRegression};
pub use metrics::{ModelMetrics, accuracy, f1_score, mean_std, roc_auc};
pub use split::{Split, require_both_classes, stratified_folds, stratified_split};
pub use voting::{EnsembleConfig, Member, ProbabilisticClassifier, SoftVotingEnsemble};

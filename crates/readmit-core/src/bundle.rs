//! The immutable unit of publication: a fitted classifier plus every
//! preprocessing parameter needed to replay its feature transform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use readmit_ensemble::{ModelMetrics, ProbabilisticClassifier, SoftVotingEnsemble};
use readmit_ingest::DataProvenance;
use readmit_model::FeatureRow;
use readmit_transform::FeaturePipeline;

pub const MODEL_TYPE: &str = "Soft-Voting Multi-Algorithm Ensemble";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pipeline: FeaturePipeline,
    classifier: SoftVotingEnsemble,
    metrics: ModelMetrics,
    trained_at: DateTime<Utc>,
    data_source: DataProvenance,
    training_records: usize,
}

impl ModelBundle {
    pub fn new(
        pipeline: FeaturePipeline,
        classifier: SoftVotingEnsemble,
        metrics: ModelMetrics,
        trained_at: DateTime<Utc>,
        data_source: DataProvenance,
        training_records: usize,
    ) -> Self {
        Self {
            pipeline,
            classifier,
            metrics,
            trained_at,
            data_source,
            training_records,
        }
    }

    /// Positive-class probability for a request row, using only persisted state.
    pub fn probability(&self, row: &FeatureRow) -> f64 {
        let features = self.pipeline.transform_row(row);
        self.classifier.predict_proba(features.view())
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn classifier(&self) -> &SoftVotingEnsemble {
        &self.classifier
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn accuracy(&self) -> f64 {
        self.metrics.accuracy
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn data_source(&self) -> DataProvenance {
        self.data_source
    }

    pub fn training_records(&self) -> usize {
        self.training_records
    }

    pub fn algorithm_names(&self) -> Vec<&'static str> {
        self.classifier.algorithm_names()
    }
}

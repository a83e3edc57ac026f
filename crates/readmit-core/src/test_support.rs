//! Fixtures shared by the unit tests.

use chrono::{DateTime, Utc};

use readmit_ensemble::{EnsembleConfig, EvaluationConfig, fit_and_evaluate};
use readmit_ingest::{DataProvenance, SyntheticConfig, SyntheticGenerator};
use readmit_model::{CleanedRecord, FeatureRow};
use readmit_normalize::Cleaner;
use readmit_transform::{FeaturePipeline, PipelineConfig};

use crate::bundle::ModelBundle;

/// A small but fully fitted bundle trained on a fixed synthetic cohort.
pub(crate) fn small_bundle() -> ModelBundle {
    let records = SyntheticGenerator::new(SyntheticConfig {
        seed: 11,
        samples: 160,
    })
    .generate()
    .unwrap();
    let cleaned = Cleaner::default().clean(&records);
    let rows: Vec<FeatureRow> = cleaned.records.iter().map(CleanedRecord::to_row).collect();
    let labels: Vec<u8> = cleaned
        .records
        .iter()
        .map(|record| record.readmitted_30_days)
        .collect();
    let (pipeline, matrix) =
        FeaturePipeline::fit_transform(&rows, &labels, &PipelineConfig::default()).unwrap();
    let evaluation = fit_and_evaluate(
        &EnsembleConfig::fast(),
        &EvaluationConfig::default(),
        &matrix,
        &labels,
    )
    .unwrap();
    let trained_at: DateTime<Utc> = DateTime::parse_from_rfc3339("2026-01-15T08:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    ModelBundle::new(
        pipeline,
        evaluation.model,
        evaluation.metrics,
        trained_at,
        DataProvenance::Synthetic,
        rows.len(),
    )
}

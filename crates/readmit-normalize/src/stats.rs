//! Descriptive statistics over a cleaned dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use readmit_model::CleanedRecord;
use readmit_model::stats::{mean, median};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_records: usize,
    /// Fraction of records labelled readmitted.
    pub readmission_rate: f64,
    pub age_mean: f64,
    pub age_median: f64,
    pub diagnosis_distribution: BTreeMap<String, usize>,
    /// Cells without a value across all carried-over columns.
    pub missing_values: usize,
    /// Records with no missing cells.
    pub complete_records: usize,
}

impl DatasetStats {
    pub fn compute(records: &[CleanedRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let positives = records.iter().filter(|record| record.is_positive()).count();
        let mut diagnosis_distribution = BTreeMap::new();
        for record in records {
            *diagnosis_distribution
                .entry(record.primary_diagnosis.clone())
                .or_insert(0) += 1;
        }
        let missing_per_record: Vec<usize> = records
            .iter()
            .map(CleanedRecord::missing_extra_count)
            .collect();
        Self {
            total_records: records.len(),
            readmission_rate: positives as f64 / records.len() as f64,
            age_mean: mean(records.iter().map(|record| record.age)).unwrap_or(0.0),
            age_median: median(records.iter().map(|record| record.age)).unwrap_or(0.0),
            diagnosis_distribution,
            missing_values: missing_per_record.iter().sum(),
            complete_records: missing_per_record.iter().filter(|count| **count == 0).count(),
        }
    }
}

//! Raw record → [`CleanedRecord`] normalization.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use readmit_model::stats::median;
use readmit_model::{CleanedRecord, FieldValue, PatientRecord, fields};

use crate::aliases::{apply_aliases, strip_target_proxies};
use crate::required::{self, CATEGORICAL_FIELDS, NUMERIC_FIELDS};
use crate::target::{TargetSource, derive_target};

/// Cleaning options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Seed for the noise term of the heuristic label.
    pub heuristic_seed: u64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self { heuristic_seed: 42 }
    }
}

/// What cleaning did to a batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_records: usize,
    pub kept_records: usize,
    pub dropped_blank: usize,
    pub dropped_invalid_age: usize,
    pub dropped_negative_stay: usize,
    /// Labels produced by each derivation rule.
    pub target_sources: BTreeMap<TargetSource, usize>,
    /// Required cells filled with a median or a table default, per field.
    pub imputed: BTreeMap<String, usize>,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.dropped_blank + self.dropped_invalid_age + self.dropped_negative_stay
    }

    pub fn log(&self) {
        info!(
            input = self.input_records,
            kept = self.kept_records,
            dropped = self.dropped(),
            "cleaned patient records"
        );
        for (source, count) in &self.target_sources {
            debug!(%source, count, "target label source");
        }
        for (field, count) in &self.imputed {
            debug!(field = %field, count, "imputed required field");
        }
    }
}

/// Cleaned records with the report describing how they were produced.
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub records: Vec<CleanedRecord>,
    pub report: CleaningReport,
}

/// Record that passed the row filters, awaiting imputation.
struct Staged {
    record: PatientRecord,
    numeric: [Option<f64>; 4],
    target: u8,
}

/// Normalizes raw patient records.
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleanerConfig,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Clean a batch.
    ///
    /// Rows that are entirely empty, have an age outside `[0,120]`, or a
    /// negative length of stay are dropped. Required numeric fields are clipped
    /// to their bounds, then gaps are filled with the batch median of the
    /// clipped values, or the table default when no value exists at all.
    pub fn clean(&self, records: &[PatientRecord]) -> CleanOutput {
        let mut rng = StdRng::seed_from_u64(self.config.heuristic_seed);
        let mut report = CleaningReport {
            input_records: records.len(),
            ..CleaningReport::default()
        };

        let mut staged = Vec::with_capacity(records.len());
        for raw in records {
            if raw.is_blank() {
                report.dropped_blank += 1;
                continue;
            }
            let mut record = raw.clone();
            apply_aliases(&mut record);

            let numeric = NUMERIC_FIELDS.map(|field| record.field(field.name).as_number());
            if numeric[0].is_some_and(|age| !(required::AGE.min..=required::AGE.max).contains(&age))
            {
                report.dropped_invalid_age += 1;
                continue;
            }
            if numeric[1].is_some_and(|stay| stay < 0.0) {
                report.dropped_negative_stay += 1;
                continue;
            }

            let (target, source) = derive_target(&record, &mut rng);
            *report.target_sources.entry(source).or_default() += 1;
            strip_target_proxies(&mut record);
            record.remove(fields::TARGET);

            staged.push(Staged {
                record,
                numeric,
                target,
            });
        }

        let medians: [Option<f64>; 4] = std::array::from_fn(|i| {
            let field = NUMERIC_FIELDS[i];
            median(
                staged
                    .iter()
                    .filter_map(|row| row.numeric[i])
                    .map(|value| field.clip(value)),
            )
        });

        let extra_columns: BTreeSet<String> = staged
            .iter()
            .flat_map(|row| row.record.keys().cloned())
            .filter(|key| !required::is_required(key))
            .collect();

        let cleaned: Vec<CleanedRecord> = staged
            .into_iter()
            .map(|row| build_record(row, &medians, &extra_columns, &mut report))
            .collect();

        report.kept_records = cleaned.len();
        report.log();
        CleanOutput {
            records: cleaned,
            report,
        }
    }
}

fn build_record(
    row: Staged,
    medians: &[Option<f64>; 4],
    extra_columns: &BTreeSet<String>,
    report: &mut CleaningReport,
) -> CleanedRecord {
    let mut numeric = [0.0; 4];
    for (i, field) in NUMERIC_FIELDS.iter().enumerate() {
        numeric[i] = match row.numeric[i] {
            Some(value) => field.clip(value),
            None => {
                *report.imputed.entry(field.name.to_string()).or_default() += 1;
                medians[i].unwrap_or(field.default)
            }
        };
    }

    let mut categorical: [String; 4] = Default::default();
    for (i, field) in CATEGORICAL_FIELDS.iter().enumerate() {
        categorical[i] = match row.record.field(field.name).as_text() {
            Some(value) => value,
            None => {
                *report.imputed.entry(field.name.to_string()).or_default() += 1;
                field.default.to_string()
            }
        };
    }

    let extra = extra_columns
        .iter()
        .map(|column| (column.clone(), extra_value(column, row.record.field(column))))
        .collect();

    let [age, length_of_stay, num_medications_prescribed, procedures_count] = numeric;
    let [gender, primary_diagnosis, admission_type, discharge_location] = categorical;
    CleanedRecord {
        age,
        length_of_stay,
        num_medications_prescribed,
        procedures_count,
        gender,
        primary_diagnosis,
        admission_type,
        discharge_location,
        readmitted_30_days: row.target,
        extra,
    }
}

/// Disease parameters get typed fills; other columns are carried unchanged.
fn extra_value(column: &str, value: FieldValue) -> FieldValue {
    if fields::DISEASE_TEXT_PARAMS.contains(&column) {
        return FieldValue::Text(
            value
                .as_text()
                .unwrap_or_else(|| fields::UNKNOWN_CATEGORY.to_string()),
        );
    }
    if fields::DISEASE_NUMERIC_PARAMS.contains(&column) {
        return FieldValue::Number(value.as_number().unwrap_or(0.0));
    }
    value
}

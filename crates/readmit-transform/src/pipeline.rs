//! Stateful feature pipeline.
//!
//! The pipeline is fitted once on the training rows and then replayed,
//! unchanged, on every inference request. Fitting runs these steps in order:
//!
//! 1. **Column drop**: identifier and timestamp columns and the target are removed.
//! 2. **Categorical encoding**: every column holding any non-numeric value is
//!    label-encoded. Missing cells become the literal category `"Unknown"`
//!    before the vocabulary is learned.
//! 3. **Numeric imputation**: missing numeric cells take the column median.
//! 4. **Selection**: columns are scored with the ANOVA F statistic and either
//!    all kept or reduced to the top `k`.
//! 5. **Robust scaling**: numeric columns are centred on the median and divided
//!    by the interquartile range.
//!
//! # Inference
//!
//! [`FeaturePipeline::transform_row`] replays steps 2–5 with the persisted
//! parameters. It never refits:
//!
//! - an unseen category encodes as [`OUT_OF_VOCABULARY`](crate::encoding::OUT_OF_VOCABULARY);
//! - an absent categorical column is filled with `"Unknown"`;
//! - an absent numeric column is filled with `0`;
//! - a numeric cell that is present but null or unparseable takes the fitted median.
//!
//! # Example
//!
//! ```ignore
//! let (pipeline, matrix) = FeaturePipeline::fit_transform(&rows, &labels, &PipelineConfig::default())?;
//! let vector = pipeline.transform_row(&request_row);
//! assert_eq!(vector.len(), matrix.ncols());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use readmit_model::{DataQualityError, FeatureRow, FieldValue, Result, fields};

use crate::encoding::CategoryEncoder;
use crate::imputation::NumericImputer;
use crate::scaling::RobustScaler;
use crate::selection::{FeatureSelector, SelectionMode};

/// Pipeline options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub selection: SelectionMode,
}

/// Whether a column is label-encoded or treated as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

/// Fitted preprocessing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    /// Input columns in matrix order, after identifiers and target were dropped.
    original_feature_names: Vec<String>,
    /// Encoded matrix columns. Label encoding keeps one column per input.
    feature_columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    encoders: BTreeMap<String, CategoryEncoder>,
    imputer: NumericImputer,
    selector: FeatureSelector,
    /// Fitted on the projected matrix, so its indices refer to selected columns.
    scaler: RobustScaler,
}

/// True if a column takes part in feature construction.
fn is_feature_column(name: &str) -> bool {
    name != fields::TARGET && !fields::is_identifier(name)
}

/// Classify every feature column across the training rows.
fn classify_columns(rows: &[FeatureRow]) -> Vec<(String, ColumnKind)> {
    let mut names = BTreeSet::new();
    for row in rows {
        names.extend(row.keys().filter(|name| is_feature_column(name)).cloned());
    }
    names
        .into_iter()
        .map(|name| {
            let categorical = rows.iter().any(|row| {
                row.get(&name)
                    .is_some_and(|value| !value.is_missing() && value.as_number().is_none())
            });
            let kind = if categorical {
                ColumnKind::Categorical
            } else {
                ColumnKind::Numeric
            };
            (name, kind)
        })
        .collect()
}

fn category_of(value: Option<&FieldValue>) -> String {
    value
        .and_then(FieldValue::as_text)
        .unwrap_or_else(|| fields::UNKNOWN_CATEGORY.to_string())
}

impl FeaturePipeline {
    /// Fit every step on `rows` and return the transformed training matrix.
    ///
    /// `labels[i]` is the binary target of `rows[i]`.
    pub fn fit_transform(
        rows: &[FeatureRow],
        labels: &[u8],
        config: &PipelineConfig,
    ) -> Result<(Self, Array2<f64>)> {
        if rows.is_empty() {
            return Err(DataQualityError::NoRecords);
        }
        if rows.len() != labels.len() {
            return Err(DataQualityError::Message(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        // Step 1: drop identifiers and target.
        let columns = classify_columns(rows);
        if columns.is_empty() {
            return Err(DataQualityError::EmptyFeatureSet);
        }
        let original_feature_names: Vec<String> =
            columns.iter().map(|(name, _)| name.clone()).collect();
        let kinds: Vec<ColumnKind> = columns.iter().map(|(_, kind)| *kind).collect();

        // Step 2: encode categoricals; numeric cells stay NaN when missing.
        let mut encoders = BTreeMap::new();
        for (name, kind) in &columns {
            if *kind == ColumnKind::Categorical {
                let encoder = CategoryEncoder::fit(rows.iter().map(|row| category_of(row.get(name))));
                encoders.insert(name.clone(), encoder);
            }
        }
        let mut matrix = Array2::<f64>::zeros((rows.len(), columns.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, (name, kind)) in columns.iter().enumerate() {
                matrix[[i, j]] = match kind {
                    ColumnKind::Categorical => encoders
                        .get(name)
                        .map_or(0.0, |encoder| encoder.encode(&category_of(row.get(name))) as f64),
                    ColumnKind::Numeric => row
                        .get(name)
                        .and_then(FieldValue::as_number)
                        .unwrap_or(f64::NAN),
                };
            }
        }

        // Step 3: median imputation over numeric columns.
        let numeric_indices: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == ColumnKind::Numeric)
            .map(|(index, _)| index)
            .collect();
        let imputer = NumericImputer::fit(&matrix, &numeric_indices);
        imputer.transform_in_place(&mut matrix);

        // Step 4: score and select.
        let selector = FeatureSelector::fit(&matrix, labels, config.selection);
        if selector.selected().is_empty() {
            return Err(DataQualityError::EmptyFeatureSet);
        }
        let mut projected = selector.project(&matrix);

        // Step 5: robust scaling of the numeric columns that survived selection.
        let scaled_positions: Vec<usize> = selector
            .selected()
            .iter()
            .enumerate()
            .filter(|(_, column)| kinds[**column] == ColumnKind::Numeric)
            .map(|(position, _)| position)
            .collect();
        let scaler = RobustScaler::fit(&projected, &scaled_positions);
        scaler.transform_in_place(&mut projected);

        debug!(
            columns = original_feature_names.len(),
            categorical = encoders.len(),
            selected = selector.selected().len(),
            "fitted feature pipeline"
        );

        let pipeline = Self {
            feature_columns: original_feature_names.clone(),
            original_feature_names,
            kinds,
            encoders,
            imputer,
            selector,
            scaler,
        };
        Ok((pipeline, projected))
    }

    /// Replay the fitted steps on a single row.
    pub fn transform_row(&self, row: &FeatureRow) -> Array1<f64> {
        let mut encoded = Vec::with_capacity(self.original_feature_names.len());
        for (index, (name, kind)) in self
            .original_feature_names
            .iter()
            .zip(&self.kinds)
            .enumerate()
        {
            let value = match kind {
                ColumnKind::Categorical => self
                    .encoders
                    .get(name)
                    .map_or(0.0, |encoder| encoder.encode(&category_of(row.get(name))) as f64),
                ColumnKind::Numeric => match row.get(name) {
                    None => 0.0,
                    Some(cell) => cell.as_number().unwrap_or_else(|| {
                        self.imputer.median_for(index).unwrap_or(0.0)
                    }),
                },
            };
            encoded.push(value);
        }
        let mut projected = self.selector.project_row(&encoded);
        self.scaler.transform_row(&mut projected);
        Array1::from(projected)
    }

    /// Replay the fitted steps on many rows.
    pub fn transform_rows(&self, rows: &[FeatureRow]) -> Array2<f64> {
        let width = self.selector.selected().len();
        let mut matrix = Array2::<f64>::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            matrix.row_mut(i).assign(&self.transform_row(row));
        }
        matrix
    }

    pub fn original_feature_names(&self) -> &[String] {
        &self.original_feature_names
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Names of the columns that reach the classifier.
    pub fn selected_columns(&self) -> Vec<&str> {
        self.selector
            .selected()
            .iter()
            .map(|&index| self.feature_columns[index].as_str())
            .collect()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.original_feature_names
            .iter()
            .position(|column| column == name)
            .map(|index| self.kinds[index])
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn numerical_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Numeric)
    }

    fn columns_of(&self, wanted: ColumnKind) -> Vec<String> {
        self.original_feature_names
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind == wanted)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn encoder(&self, column: &str) -> Option<&CategoryEncoder> {
        self.encoders.get(column)
    }

    pub fn selector(&self) -> &FeatureSelector {
        &self.selector
    }

    pub fn scaler(&self) -> &RobustScaler {
        &self.scaler
    }

    pub fn imputer(&self) -> &NumericImputer {
        &self.imputer
    }

    /// Width of the transformed matrix.
    pub fn output_width(&self) -> usize {
        self.selector.selected().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, FieldValue)]) -> FeatureRow {
        cells
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    fn training() -> (Vec<FeatureRow>, Vec<u8>) {
        let rows = vec![
            row(&[
                ("age", FieldValue::Number(80.0)),
                ("gender", "Male".into()),
                ("patient_id", "P1".into()),
                ("readmitted_30_days", FieldValue::Number(1.0)),
            ]),
            row(&[
                ("age", FieldValue::Number(40.0)),
                ("gender", "Female".into()),
                ("patient_id", "P2".into()),
                ("readmitted_30_days", FieldValue::Number(0.0)),
            ]),
            row(&[
                ("age", FieldValue::Missing),
                ("gender", FieldValue::Missing),
                ("patient_id", "P3".into()),
                ("readmitted_30_days", FieldValue::Number(0.0)),
            ]),
            row(&[
                ("age", FieldValue::Number(70.0)),
                ("gender", "Female".into()),
                ("patient_id", "P4".into()),
                ("readmitted_30_days", FieldValue::Number(1.0)),
            ]),
        ];
        (rows, vec![1, 0, 0, 1])
    }

    #[test]
    fn identifiers_and_target_are_dropped() {
        let (rows, labels) = training();
        let (pipeline, matrix) =
            FeaturePipeline::fit_transform(&rows, &labels, &PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.original_feature_names(), ["age", "gender"]);
        assert_eq!(pipeline.feature_columns().len(), pipeline.original_feature_names().len());
        assert_eq!(matrix.dim(), (4, 2));
        assert_eq!(pipeline.categorical_columns(), vec!["gender".to_string()]);
        assert_eq!(pipeline.numerical_columns(), vec!["age".to_string()]);
    }

    #[test]
    fn missing_category_becomes_unknown() {
        let (rows, labels) = training();
        let (pipeline, _) =
            FeaturePipeline::fit_transform(&rows, &labels, &PipelineConfig::default()).unwrap();
        let encoder = pipeline.encoder("gender").unwrap();
        assert_eq!(encoder.categories(), ["Female", "Male", "Unknown"]);
    }

    #[test]
    fn training_rows_replay_identically() {
        let (rows, labels) = training();
        let (pipeline, matrix) =
            FeaturePipeline::fit_transform(&rows, &labels, &PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.transform_rows(&rows), matrix);
    }

    #[test]
    fn empty_feature_set_is_rejected() {
        let rows = vec![row(&[("patient_id", "P1".into())])];
        let error =
            FeaturePipeline::fit_transform(&rows, &[0], &PipelineConfig::default()).unwrap_err();
        assert_eq!(error, DataQualityError::EmptyFeatureSet);
    }
}

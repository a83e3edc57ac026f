//! Median imputation for numeric columns.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::scaling::column_medians;

/// Fill values for numeric matrix columns. Missing cells are `NaN` until imputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericImputer {
    columns: Vec<usize>,
    medians: Vec<f64>,
}

impl NumericImputer {
    /// Learn medians from the observed values; an all-missing column imputes 0.
    pub fn fit(matrix: &Array2<f64>, columns: &[usize]) -> Self {
        let all = column_medians(matrix);
        let medians = columns
            .iter()
            .map(|&column| all.get(column).copied().unwrap_or(0.0))
            .collect();
        Self {
            columns: columns.to_vec(),
            medians,
        }
    }

    pub fn transform_in_place(&self, matrix: &mut Array2<f64>) {
        for (&column, &median) in self.columns.iter().zip(&self.medians) {
            matrix.column_mut(column).mapv_inplace(|value| {
                if value.is_finite() { value } else { median }
            });
        }
    }

    /// Fill value for a matrix column, if it is numeric.
    pub fn median_for(&self, column: usize) -> Option<f64> {
        self.columns
            .iter()
            .position(|&c| c == column)
            .map(|position| self.medians[position])
    }
}

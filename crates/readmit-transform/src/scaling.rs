//! Median/IQR scaling.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use readmit_model::stats::{quantile_sorted, sorted_finite};

/// Per-column centre and scale for the columns it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustScaler {
    /// Matrix column indices this scaler applies to.
    columns: Vec<usize>,
    centers: Vec<f64>,
    scales: Vec<f64>,
}

impl RobustScaler {
    /// Fit on the listed columns of `matrix`. A zero interquartile range scales by 1.
    pub fn fit(matrix: &Array2<f64>, columns: &[usize]) -> Self {
        let mut centers = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());
        for &column in columns {
            let (center, scale) = column_stats(matrix.column(column));
            centers.push(center);
            scales.push(scale);
        }
        Self {
            columns: columns.to_vec(),
            centers,
            scales,
        }
    }

    pub fn transform_in_place(&self, matrix: &mut Array2<f64>) {
        for (i, &column) in self.columns.iter().enumerate() {
            let (center, scale) = (self.centers[i], self.scales[i]);
            matrix
                .column_mut(column)
                .mapv_inplace(|value| (value - center) / scale);
        }
    }

    pub fn transform_row(&self, row: &mut [f64]) {
        for (i, &column) in self.columns.iter().enumerate() {
            if let Some(value) = row.get_mut(column) {
                *value = (*value - self.centers[i]) / self.scales[i];
            }
        }
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn center(&self, position: usize) -> Option<f64> {
        self.centers.get(position).copied()
    }

    pub fn scale(&self, position: usize) -> Option<f64> {
        self.scales.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn column_stats(column: ArrayView1<'_, f64>) -> (f64, f64) {
    let sorted = sorted_finite(column.iter().copied());
    let center = quantile_sorted(&sorted, 0.5).unwrap_or(0.0);
    let q1 = quantile_sorted(&sorted, 0.25).unwrap_or(0.0);
    let q3 = quantile_sorted(&sorted, 0.75).unwrap_or(0.0);
    let iqr = q3 - q1;
    let scale = if iqr.abs() < f64::EPSILON || !iqr.is_finite() {
        1.0
    } else {
        iqr
    };
    (center, scale)
}

/// Median of the finite values in each column; 0 for a column with none.
pub fn column_medians(matrix: &Array2<f64>) -> Vec<f64> {
    matrix
        .axis_iter(Axis(1))
        .map(|column| {
            quantile_sorted(&sorted_finite(column.iter().copied()), 0.5).unwrap_or(0.0)
        })
        .collect()
}

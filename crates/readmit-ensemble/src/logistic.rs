//! L2-regularised logistic regression fitted by Newton's method.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::weights::sample_weights;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    pub balanced: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 0.1,
            max_iter: 100,
            tolerance: 1e-6,
            balanced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    iterations: usize,
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// Minimise `sum_i w_i * logloss_i + ||beta||^2 / (2C)`; the intercept is not penalised.
    pub fn fit(config: &LogisticConfig, matrix: &Array2<f64>, labels: &[u8]) -> Self {
        let (n, p) = matrix.dim();
        let weights = sample_weights(labels, config.balanced);
        let lambda = if config.c > 0.0 { 1.0 / config.c } else { 0.0 };

        // Parameter layout: [beta_0 .. beta_{p-1}, intercept].
        let dim = p + 1;
        let mut theta = Array1::<f64>::zeros(dim);
        let mut iterations = 0;
        for iteration in 0..config.max_iter {
            iterations = iteration + 1;
            let mut gradient = Array1::<f64>::zeros(dim);
            let mut hessian = Array2::<f64>::zeros((dim, dim));
            for i in 0..n {
                let row = matrix.row(i);
                let z = row.dot(&theta.slice(ndarray::s![..p])) + theta[p];
                let prob = sigmoid(z);
                let residual = weights[i] * (prob - f64::from(labels[i]));
                let curvature = weights[i] * prob * (1.0 - prob);
                for a in 0..dim {
                    let xa = if a < p { row[a] } else { 1.0 };
                    gradient[a] += residual * xa;
                    for b in a..dim {
                        let xb = if b < p { row[b] } else { 1.0 };
                        hessian[[a, b]] += curvature * xa * xb;
                    }
                }
            }
            for a in 0..dim {
                for b in 0..a {
                    hessian[[a, b]] = hessian[[b, a]];
                }
            }
            for a in 0..p {
                gradient[a] += lambda * theta[a];
                hessian[[a, a]] += lambda;
            }
            hessian[[p, p]] += 1e-10;

            let Some(step) = solve(hessian, gradient) else {
                debug!(iteration, "singular Hessian, stopping early");
                break;
            };
            theta -= &step;
            if step.iter().all(|delta| delta.abs() < config.tolerance) {
                break;
            }
        }

        Self {
            coefficients: theta.slice(ndarray::s![..p]).to_vec(),
            intercept: theta[p],
            iterations,
        }
    }

    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(row.iter())
            .map(|(beta, x)| beta * x)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| a[[r1, col]].abs().total_cmp(&a[[r2, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solves_small_system() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve(a, b).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn singular_system_is_rejected() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(solve(a, array![1.0, 2.0]).is_none());
    }

    #[test]
    fn learns_direction_of_effect() {
        let matrix = array![[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]];
        let labels = [0, 0, 0, 1, 0, 1, 1, 1];
        let model = LogisticRegression::fit(&LogisticConfig::default(), &matrix, &labels);
        assert!(model.coefficients()[0] > 0.0);
        assert!(model.predict_proba(array![2.0].view()) > 0.5);
        assert!(model.predict_proba(array![-2.0].view()) < 0.5);
    }

    #[test]
    fn regularisation_shrinks_coefficients() {
        let matrix = array![[-2.0], [-1.0], [1.0], [2.0]];
        let labels = [0, 0, 1, 1];
        let strong = LogisticConfig {
            c: 0.01,
            ..LogisticConfig::default()
        };
        let weak = LogisticConfig {
            c: 10.0,
            ..LogisticConfig::default()
        };
        let shrunk = LogisticRegression::fit(&strong, &matrix, &labels);
        let loose = LogisticRegression::fit(&weak, &matrix, &labels);
        assert!(shrunk.coefficients()[0].abs() < loose.coefficients()[0].abs());
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(0.0), 0.5);
    }
}

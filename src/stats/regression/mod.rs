// Regression module
//
// Ordinary least squares with an intercept, solved through the normal
// equations. The moderation submodule adds the two-predictor interaction
// model, simple-effects tests and the Johnson–Neyman technique.

pub mod moderation;

pub use moderation::{
    fit_moderated_regression, johnson_neyman_boundaries, johnson_neyman_from_fit, simple_effects,
    simple_effects_at_sd, JohnsonNeymanParams, JohnsonNeymanResult, SimpleEffect,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::descriptive::mean;
use crate::stats::distributions::t_two_tailed_p;
use crate::stats::{Degeneracy, Outcome};

/// Pivots smaller than this are treated as zero.
pub(crate) const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// Fitted linear model. Coefficient 0 is the intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub coefficients: Vec<f64>,
    /// σ²·(XᵀX)⁻¹
    pub covariance: Vec<Vec<f64>>,
    pub standard_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    /// √(SSE / df)
    pub residual_standard_error: f64,
    /// Residual degrees of freedom n - p - 1
    pub df: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub fitted_values: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl RegressionResult {
    /// All-zero result with `n_coefficients` coefficients and `n` observations.
    pub(crate) fn zeroed(n_coefficients: usize, n: usize) -> Self {
        RegressionResult {
            coefficients: vec![0.0; n_coefficients],
            covariance: vec![vec![0.0; n_coefficients]; n_coefficients],
            standard_errors: vec![0.0; n_coefficients],
            t_values: vec![0.0; n_coefficients],
            p_values: vec![1.0; n_coefficients],
            residual_standard_error: 0.0,
            df: 0,
            r_squared: 0.0,
            adj_r_squared: 0.0,
            fitted_values: vec![0.0; n],
            residuals: vec![0.0; n],
        }
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Predicted value for one row of predictors (without the intercept column).
    pub fn predict(&self, predictors: &[f64]) -> f64 {
        self.coefficients[0]
            + self.coefficients[1..]
                .iter()
                .zip(predictors)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Fits `y` on the given predictor columns plus an intercept.
///
/// # Arguments
/// * `predictors` - One vector per predictor, each as long as `y`
/// * `y` - Response
///
/// A singular XᵀX gives a zeroed [`Degeneracy::SingularMatrix`] result; no
/// residual degrees of freedom gives the coefficients without inference.
pub fn fit_ols<T: AsRef<[f64]>>(predictors: &[T], y: &[f64]) -> Result<Outcome<RegressionResult>> {
    let n = y.len();
    if n == 0 {
        return Err(Error::EmptyData("regression needs observations".into()));
    }

    // Design matrix in column form, intercept first
    let mut x_matrix: Vec<Vec<f64>> = Vec::with_capacity(predictors.len() + 1);
    x_matrix.push(vec![1.0; n]);
    for (j, column) in predictors.iter().enumerate() {
        let column = column.as_ref();
        if column.len() != n {
            return Err(Error::DimensionMismatch(format!(
                "regression: predictor {} has {} values, response has {}",
                j,
                column.len(),
                n
            )));
        }
        x_matrix.push(column.to_vec());
    }

    let xt_x = matrix_multiply_transpose(&x_matrix, &x_matrix);
    match matrix_inverse(&xt_x) {
        Some(xt_x_inv) => Ok(finish_fit(&x_matrix, y, &xt_x_inv)),
        None => Ok(Outcome::degenerate(
            RegressionResult::zeroed(x_matrix.len(), n),
            Degeneracy::SingularMatrix,
            "OLS",
        )),
    }
}

/// Coefficients, residuals and inference from an already inverted XᵀX.
pub(crate) fn finish_fit(
    x_matrix: &[Vec<f64>],
    y: &[f64],
    xt_x_inv: &[Vec<f64>],
) -> Outcome<RegressionResult> {
    let n = y.len();
    let k = x_matrix.len();

    // β = (XᵀX)⁻¹ Xᵀy
    let xt_y = vec_multiply_transpose(x_matrix, y);
    let coefficients: Vec<f64> = xt_x_inv
        .iter()
        .map(|row| row.iter().zip(xt_y.iter()).map(|(a, b)| a * b).sum())
        .collect();

    let fitted_values: Vec<f64> = (0..n)
        .map(|i| (0..k).map(|j| coefficients[j] * x_matrix[j][i]).sum())
        .collect();
    let residuals: Vec<f64> = y
        .iter()
        .zip(fitted_values.iter())
        .map(|(&y, &y_hat)| y - y_hat)
        .collect();

    let y_mean = mean(y);
    let ss_total: f64 = y.iter().map(|&v| (v - y_mean).powi(2)).sum();
    let ss_residual: f64 = residuals.iter().map(|r| r.powi(2)).sum();
    let r_squared = if ss_total > 0.0 {
        1.0 - ss_residual / ss_total
    } else {
        0.0
    };

    let mut result = RegressionResult {
        r_squared,
        fitted_values,
        residuals,
        ..RegressionResult::zeroed(k, n)
    };
    result.coefficients = coefficients;

    if n <= k {
        return Outcome::degenerate(result, Degeneracy::InsufficientDegreesOfFreedom, "OLS");
    }

    let df = n - k;
    let mse = ss_residual / df as f64;
    result.df = df;
    result.residual_standard_error = mse.sqrt();
    result.adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df as f64;
    result.covariance = xt_x_inv
        .iter()
        .map(|row| row.iter().map(|v| v * mse).collect())
        .collect();
    result.standard_errors = (0..k).map(|i| result.covariance[i][i].max(0.0).sqrt()).collect();

    for i in 0..k {
        let se = result.standard_errors[i];
        if se > 0.0 {
            let t = result.coefficients[i] / se;
            result.t_values[i] = t;
            result.p_values[i] = t_two_tailed_p(t, df as f64);
        }
    }

    Outcome::Computed(result)
}

/// Transposed product (Aᵀ·B) of column-major matrices.
pub(crate) fn matrix_multiply_transpose(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|col_a| {
            b.iter()
                .map(|col_b| col_a.iter().zip(col_b.iter()).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect()
}

/// Transposed product Aᵀ·y of a column-major matrix.
pub(crate) fn vec_multiply_transpose(a: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|col| col.iter().zip(y.iter()).map(|(x, v)| x * v).sum())
        .collect()
}

/// Matrix inverse by Gauss–Jordan elimination with partial pivoting.
///
/// Returns `None` for an empty, non-square or singular matrix.
pub(crate) fn matrix_inverse(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    if n == 0 || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented matrix [A|I]
    let mut augmented: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut aug = Vec::with_capacity(2 * n);
            aug.extend_from_slice(row);
            aug.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            aug
        })
        .collect();

    for i in 0..n {
        // Pivot selection
        let max_row = (i..n)
            .max_by(|&a, &b| {
                augmented[a][i]
                    .abs()
                    .partial_cmp(&augmented[b][i].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(i);

        if augmented[max_row][i].abs() < SINGULARITY_TOLERANCE {
            return None;
        }
        augmented.swap(i, max_row);

        let pivot = augmented[i][i];
        for value in augmented[i].iter_mut() {
            *value /= pivot;
        }

        for j in 0..n {
            if j != i {
                let factor = augmented[j][i];
                if factor != 0.0 {
                    for k in 0..2 * n {
                        augmented[j][k] -= factor * augmented[i][k];
                    }
                }
            }
        }
    }

    // Right half holds the inverse
    Some(augmented.into_iter().map(|row| row[n..].to_vec()).collect())
}

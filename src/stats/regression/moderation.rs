//! Moderated regression: `y = b0 + b1·x + b2·m + b3·x·m`.
//!
//! The conditional effect of `x` at moderator value `m` is `b1 + b3·m`.
//! Simple-effects tests probe it at chosen points, the Johnson–Neyman
//! technique finds the values of `m` where it changes significance.

use serde::{Deserialize, Serialize};

use super::{finish_fit, RegressionResult, SINGULARITY_TOLERANCE};
use crate::error::{check_alpha, Error, Result};
use crate::stats::descriptive::{mean, standard_deviation};
use crate::stats::distributions::{t_critical, t_two_tailed_p};
use crate::stats::{Degeneracy, Outcome, VarianceKind};

/// Coefficient positions in a moderated fit.
pub const X_COEFFICIENT: usize = 1;
pub const M_COEFFICIENT: usize = 2;
pub const INTERACTION_COEFFICIENT: usize = 3;

const QUADRATIC_TOLERANCE: f64 = 1e-12;

type Matrix4 = [[f64; 4]; 4];

/// Fits the interaction model with design columns `[1, x, m, x·m]`.
///
/// XᵀX is inverted by cofactor expansion. A determinant below 1e-12 times
/// the product of the diagonal of XᵀX gives a zeroed
/// [`Degeneracy::SingularMatrix`] result.
pub fn fit_moderated_regression(x: &[f64], m: &[f64], y: &[f64]) -> Result<Outcome<RegressionResult>> {
    let n = y.len();
    if n == 0 {
        return Err(Error::EmptyData("moderated regression needs observations".into()));
    }
    if x.len() != n || m.len() != n {
        return Err(Error::DimensionMismatch(format!(
            "moderated regression: x has {}, m has {}, y has {} values",
            x.len(),
            m.len(),
            n
        )));
    }

    let interaction: Vec<f64> = x.iter().zip(m.iter()).map(|(a, b)| a * b).collect();
    let x_matrix = vec![vec![1.0; n], x.to_vec(), m.to_vec(), interaction];

    let mut xt_x = [[0.0; 4]; 4];
    for (i, row) in xt_x.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = x_matrix[i].iter().zip(x_matrix[j].iter()).map(|(a, b)| a * b).sum();
        }
    }

    match invert_4x4(&xt_x) {
        Some(inverse) => {
            let inverse: Vec<Vec<f64>> = inverse.iter().map(|row| row.to_vec()).collect();
            Ok(finish_fit(&x_matrix, y, &inverse))
        }
        None => Ok(Outcome::degenerate(
            RegressionResult::zeroed(4, n),
            Degeneracy::SingularMatrix,
            "moderated regression",
        )),
    }
}

/// Determinant of the 3×3 minor left after deleting `row` and `col`.
fn minor(matrix: &Matrix4, row: usize, col: usize) -> f64 {
    let mut sub = [[0.0; 3]; 3];
    let mut r = 0;
    for i in (0..4).filter(|&i| i != row) {
        let mut c = 0;
        for j in (0..4).filter(|&j| j != col) {
            sub[r][c] = matrix[i][j];
            c += 1;
        }
        r += 1;
    }
    sub[0][0] * (sub[1][1] * sub[2][2] - sub[1][2] * sub[2][1])
        - sub[0][1] * (sub[1][0] * sub[2][2] - sub[1][2] * sub[2][0])
        + sub[0][2] * (sub[1][0] * sub[2][1] - sub[1][1] * sub[2][0])
}

/// Inverse via the adjugate.
///
/// `None` when |det| is below 1e-12 relative to the product of the
/// diagonal, which bounds the determinant of a Gram matrix from above.
fn invert_4x4(matrix: &Matrix4) -> Option<Matrix4> {
    let mut cofactors = [[0.0; 4]; 4];
    for (i, row) in cofactors.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            *cell = sign * minor(matrix, i, j);
        }
    }

    let det: f64 = (0..4).map(|j| matrix[0][j] * cofactors[0][j]).sum();
    let scale: f64 = (0..4).map(|i| matrix[i][i]).product();
    if !(scale > 0.0) || det.abs() < SINGULARITY_TOLERANCE * scale {
        return None;
    }

    let mut inverse = [[0.0; 4]; 4];
    for (i, row) in inverse.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = cofactors[j][i] / det;
        }
    }
    Some(inverse)
}

fn check_moderated(fit: &RegressionResult) -> Result<()> {
    if fit.coefficients.len() != 4 || fit.covariance.len() != 4 {
        return Err(Error::DimensionMismatch(format!(
            "expected a moderated fit with 4 coefficients, got {}",
            fit.coefficients.len()
        )));
    }
    Ok(())
}

/// Conditional effect of `x` at one moderator value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleEffect {
    pub moderator: f64,
    pub slope: f64,
    pub standard_error: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Tests the slope of `x` at each value in `moderator_values`.
///
/// slope = b1 + b3·m, Var = V11 + 2m·V13 + m²·V33
pub fn simple_effects(
    fit: &RegressionResult,
    moderator_values: &[f64],
    alpha: f64,
) -> Result<Vec<SimpleEffect>> {
    check_alpha(alpha)?;
    check_moderated(fit)?;

    let b1 = fit.coefficients[X_COEFFICIENT];
    let b3 = fit.coefficients[INTERACTION_COEFFICIENT];
    let v11 = fit.covariance[X_COEFFICIENT][X_COEFFICIENT];
    let v13 = fit.covariance[X_COEFFICIENT][INTERACTION_COEFFICIENT];
    let v33 = fit.covariance[INTERACTION_COEFFICIENT][INTERACTION_COEFFICIENT];
    let df = fit.df as f64;

    Ok(moderator_values
        .iter()
        .map(|&m| {
            let slope = b1 + b3 * m;
            let standard_error = (v11 + 2.0 * m * v13 + m * m * v33).max(0.0).sqrt();
            let (t_statistic, p_value) = if standard_error > 0.0 && df > 0.0 {
                let t = slope / standard_error;
                (t, t_two_tailed_p(t, df))
            } else {
                (0.0, 1.0)
            };
            SimpleEffect {
                moderator: m,
                slope,
                standard_error,
                t_statistic,
                p_value,
                significant: p_value < alpha,
            }
        })
        .collect())
}

/// Simple effects at the moderator's mean and one SD either side.
pub fn simple_effects_at_sd(
    fit: &RegressionResult,
    moderator: &[f64],
    alpha: f64,
) -> Result<Vec<SimpleEffect>> {
    let center = mean(moderator);
    let sd = standard_deviation(moderator, VarianceKind::Sample);
    simple_effects(fit, &[center - sd, center, center + sd], alpha)
}

/// Inputs of the Johnson–Neyman quadratic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JohnsonNeymanParams {
    /// Slope of the focal predictor at M = 0
    pub b: f64,
    /// Interaction coefficient
    pub d: f64,
    pub var_b: f64,
    pub var_d: f64,
    pub cov_bd: f64,
    pub df: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JohnsonNeymanResult {
    /// Moderator values where significance changes, ascending
    pub boundaries: Vec<f64>,
    /// Whether the effect is significant below the lowest boundary
    pub significant_below: bool,
    /// Whether the effect is significant for every moderator value
    pub significant_everywhere: bool,
    pub critical_t: f64,
}

/// Solves `(b + dM)² = t²·(var_b + 2M·cov_bd + M²·var_d)` for M.
///
/// The effect is significant where `A·M² + B·M + C > 0` with
/// `A = d² - t²·var_d`, `B = 2(bd - t²·cov_bd)`, `C = b² - t²·var_b`.
/// When there is no sign change the effect is tested at M = 0 alone and
/// the result holds for every M.
pub fn johnson_neyman_boundaries(params: JohnsonNeymanParams, alpha: f64) -> Result<JohnsonNeymanResult> {
    check_alpha(alpha)?;
    let JohnsonNeymanParams {
        b,
        d,
        var_b,
        var_d,
        cov_bd,
        df,
    } = params;

    let critical_t = t_critical(alpha, df);
    if !critical_t.is_finite() {
        return Ok(JohnsonNeymanResult {
            boundaries: Vec::new(),
            significant_below: false,
            significant_everywhere: false,
            critical_t,
        });
    }

    let t2 = critical_t * critical_t;
    let a = d * d - t2 * var_d;
    let b_coef = 2.0 * (b * d - t2 * cov_bd);
    let c = b * b - t2 * var_b;

    // f(0) = C decides significance when the sign never changes
    let single_point = JohnsonNeymanResult {
        boundaries: Vec::new(),
        significant_below: c > 0.0,
        significant_everywhere: c > 0.0,
        critical_t,
    };

    if a.abs() < QUADRATIC_TOLERANCE {
        if b_coef.abs() < QUADRATIC_TOLERANCE {
            return Ok(single_point);
        }
        // Linear: significant on the side where B·M + C > 0
        return Ok(JohnsonNeymanResult {
            boundaries: vec![-c / b_coef],
            significant_below: b_coef < 0.0,
            significant_everywhere: false,
            critical_t,
        });
    }

    let discriminant = b_coef * b_coef - 4.0 * a * c;
    if discriminant <= 0.0 {
        return Ok(single_point);
    }

    let root = discriminant.sqrt();
    let r1 = (-b_coef - root) / (2.0 * a);
    let r2 = (-b_coef + root) / (2.0 * a);
    Ok(JohnsonNeymanResult {
        boundaries: vec![r1.min(r2), r1.max(r2)],
        // Opening upward means significant outside the roots
        significant_below: a > 0.0,
        significant_everywhere: false,
        critical_t,
    })
}

/// Johnson–Neyman boundaries for a fit from [`fit_moderated_regression`].
pub fn johnson_neyman_from_fit(fit: &RegressionResult, alpha: f64) -> Result<JohnsonNeymanResult> {
    check_moderated(fit)?;
    johnson_neyman_boundaries(
        JohnsonNeymanParams {
            b: fit.coefficients[X_COEFFICIENT],
            d: fit.coefficients[INTERACTION_COEFFICIENT],
            var_b: fit.covariance[X_COEFFICIENT][X_COEFFICIENT],
            var_d: fit.covariance[INTERACTION_COEFFICIENT][INTERACTION_COEFFICIENT],
            cov_bd: fit.covariance[X_COEFFICIENT][INTERACTION_COEFFICIENT],
            df: fit.df as f64,
        },
        alpha,
    )
}

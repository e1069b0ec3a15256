//! Simple mediation X → M → Y.
//!
//! Paths are estimated with three OLS fits:
//! - c: Y ~ X (total effect)
//! - a: M ~ X
//! - b, c′: Y ~ X + M (c′ is the direct effect)
//!
//! The indirect effect a·b is tested with the Sobel z.

use serde::{Deserialize, Serialize};

use crate::error::{check_alpha, Error, Result};
use crate::stats::descriptive::correlation_impl;
use crate::stats::distributions::standard_normal_cdf;
use crate::stats::regression::{fit_ols, RegressionResult};
use crate::stats::{Degeneracy, Outcome};

/// An estimated path coefficient with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathEstimate {
    pub estimate: f64,
    pub standard_error: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediationResult {
    /// X → M
    pub a: PathEstimate,
    /// M → Y controlling for X
    pub b: PathEstimate,
    /// Total effect X → Y
    pub c: PathEstimate,
    /// Direct effect X → Y controlling for M
    pub c_prime: PathEstimate,
    pub indirect_effect: f64,
    pub sobel_standard_error: f64,
    pub sobel_z: f64,
    pub sobel_p_value: f64,
    /// ab / c, 0 when c is 0
    pub proportion_mediated: f64,
    /// Correlation of X and M; near ±1 means the b and c′ paths are poorly separated
    pub x_m_correlation: f64,
    pub significant: bool,
}

fn path(fit: &RegressionResult, index: usize) -> PathEstimate {
    PathEstimate {
        estimate: fit.coefficients[index],
        standard_error: fit.standard_errors[index],
        p_value: fit.p_values[index],
    }
}

/// Runs the three regressions and the Sobel test.
///
/// Errors when the arrays differ in length or hold fewer than 3 points.
/// A singular or saturated fit makes the whole result degenerate.
pub fn mediation_analysis(x: &[f64], m: &[f64], y: &[f64], alpha: f64) -> Result<Outcome<MediationResult>> {
    check_alpha(alpha)?;
    if x.len() != m.len() || x.len() != y.len() {
        return Err(Error::DimensionMismatch(format!(
            "mediation: x has {}, m has {}, y has {} values",
            x.len(),
            m.len(),
            y.len()
        )));
    }
    if x.len() < 3 {
        return Err(Error::InsufficientData(
            "mediation needs at least 3 observations".into(),
        ));
    }

    let total = fit_ols(&[x], y)?;
    let a_fit = fit_ols(&[x], m)?;
    let full = fit_ols(&[x, m], y)?;

    let degeneracy: Option<Degeneracy> = [&total, &a_fit, &full]
        .iter()
        .find_map(|outcome| outcome.degeneracy());

    let (total, a_fit, full) = (total.into_value(), a_fit.into_value(), full.into_value());

    let a = path(&a_fit, 1);
    let b = path(&full, 2);
    let c = path(&total, 1);
    let c_prime = path(&full, 1);

    let indirect_effect = a.estimate * b.estimate;
    let sobel_standard_error = (b.estimate.powi(2) * a.standard_error.powi(2)
        + a.estimate.powi(2) * b.standard_error.powi(2))
    .sqrt();
    let (sobel_z, sobel_p_value) = if sobel_standard_error > 0.0 {
        let z = indirect_effect / sobel_standard_error;
        (z, 2.0 * (1.0 - standard_normal_cdf(z.abs())))
    } else {
        (0.0, 1.0)
    };
    let proportion_mediated = if c.estimate != 0.0 {
        indirect_effect / c.estimate
    } else {
        0.0
    };
    // Constant X or M has no defined correlation; report 0
    let x_m_correlation = correlation_impl(x, m).unwrap_or(0.0);

    let result = MediationResult {
        a,
        b,
        c,
        c_prime,
        indirect_effect,
        sobel_standard_error,
        sobel_z,
        sobel_p_value,
        proportion_mediated,
        x_m_correlation,
        significant: sobel_p_value < alpha,
    };

    Ok(match degeneracy {
        Some(reason) => Outcome::degenerate(result, reason, "mediation"),
        None => Outcome::Computed(result),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mediated_data() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 3.0).collect();
        let m: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 0.6 * v + ((i * 5) % 7) as f64 * 0.2 - 0.6)
            .collect();
        let y: Vec<f64> = x
            .iter()
            .zip(m.iter())
            .enumerate()
            .map(|(i, (&xv, &mv))| 0.2 * xv + 0.9 * mv + ((i * 3) % 5) as f64 * 0.2 - 0.4)
            .collect();
        (x, m, y)
    }

    #[test]
    fn test_path_decomposition() {
        let (x, m, y) = mediated_data();
        let result = mediation_analysis(&x, &m, &y, 0.05).unwrap().into_value();

        // For OLS the total effect splits exactly into direct + indirect
        assert!((result.c.estimate - (result.c_prime.estimate + result.indirect_effect)).abs() < 1e-9);
        assert!(result.a.estimate > 0.0 && result.b.estimate > 0.0);
        assert!(result.significant);
        assert!(result.proportion_mediated > 0.0 && result.proportion_mediated < 1.0);
        assert!(result.x_m_correlation > 0.9);
    }

    #[test]
    fn test_no_mediator_effect() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        // M unrelated to X
        let m: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 * v + 1.0 + ((i * 3) % 5) as f64 * 0.2 - 0.4)
            .collect();
        let result = mediation_analysis(&x, &m, &y, 0.05).unwrap().into_value();
        assert!(result.indirect_effect.abs() < 0.05);
        assert!(!result.significant);
    }

    #[test]
    fn test_invalid_input() {
        assert!(mediation_analysis(&[1.0, 2.0, 3.0], &[1.0, 2.0], &[1.0, 2.0, 3.0], 0.05).is_err());
        assert!(mediation_analysis(&[1.0, 2.0], &[1.0, 2.0], &[1.0, 2.0], 0.05).is_err());
        assert!(mediation_analysis(&[1.0, 2.0, 3.0], &[3.0, 1.0, 2.0], &[1.0, 2.0, 3.0], 1.5).is_err());
    }

    #[test]
    fn test_saturated_fit_is_degenerate() {
        // Three points leave no residual df for Y ~ X + M
        let result = mediation_analysis(&[1.0, 2.0, 3.0], &[2.0, 1.0, 3.0], &[1.0, 3.0, 2.0], 0.05).unwrap();
        assert_eq!(result.degeneracy(), Some(Degeneracy::InsufficientDegreesOfFreedom));
    }
}

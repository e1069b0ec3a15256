//! Effect sizes.
//!
//! Every function returns 0 when its denominator is zero.

use crate::error::{Error, Result};
use crate::stats::descriptive::{mean, variance};
use crate::stats::VarianceKind;

/// Cohen's d for two independent samples using the pooled standard deviation.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if n1 + n2 <= 2.0 {
        return 0.0;
    }
    let pooled_var = ((n1 - 1.0).max(0.0) * variance(a, VarianceKind::Sample)
        + (n2 - 1.0).max(0.0) * variance(b, VarianceKind::Sample))
        / (n1 + n2 - 2.0);
    let pooled_sd = pooled_var.sqrt();
    if pooled_sd > 0.0 {
        (mean(a) - mean(b)) / pooled_sd
    } else {
        0.0
    }
}

/// Cohen's d_z for paired samples: mean difference over the SD of differences.
pub fn cohens_d_paired(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let differences: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let sd = variance(&differences, VarianceKind::Sample).sqrt();
    Ok(if sd > 0.0 { mean(&differences) / sd } else { 0.0 })
}

/// η² = SS_effect / SS_total
pub fn eta_squared(ss_effect: f64, ss_total: f64) -> f64 {
    if ss_total > 0.0 {
        ss_effect / ss_total
    } else {
        0.0
    }
}

/// Partial η² = SS_effect / (SS_effect + SS_error)
pub fn partial_eta_squared(ss_effect: f64, ss_error: f64) -> f64 {
    let denominator = ss_effect + ss_error;
    if denominator > 0.0 {
        ss_effect / denominator
    } else {
        0.0
    }
}

/// ω² = (SS_between - df_between · MS_within) / (SS_total + MS_within)
///
/// Can be slightly negative for small effects; that value is returned as is.
pub fn omega_squared(ss_between: f64, df_between: usize, ms_within: f64, ss_total: f64) -> f64 {
    let denominator = ss_total + ms_within;
    if denominator > 0.0 {
        (ss_between - df_between as f64 * ms_within) / denominator
    } else {
        0.0
    }
}

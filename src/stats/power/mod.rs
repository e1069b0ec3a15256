//! Power analysis for the two-sample comparison of means.
//!
//! Uses the normal approximation to the two-sided test:
//! ```text
//! power = Φ(δ - z) + Φ(-δ - z),   δ = |d|·√(n/2),   z = z_{1-α/2}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{check_alpha, Error, Result};
use crate::stats::distributions::{inverse_normal_cdf, standard_normal_cdf};

/// Power of a two-sided two-sample test with `n_per_group` in each arm.
pub fn power_two_sample(effect_size: f64, n_per_group: usize, alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    if n_per_group == 0 {
        return Ok(0.0);
    }
    let z = inverse_normal_cdf(1.0 - alpha / 2.0);
    let delta = effect_size.abs() * (n_per_group as f64 / 2.0).sqrt();
    Ok((standard_normal_cdf(delta - z) + standard_normal_cdf(-delta - z)).clamp(0.0, 1.0))
}

/// Smallest per-group sample size in `[2, max_n]` that reaches `target_power`.
///
/// Returns `None` when the target cannot be reached within `max_n`, which is
/// always the case for a zero effect.
pub fn required_sample_size(
    effect_size: f64,
    alpha: f64,
    target_power: f64,
    max_n: usize,
) -> Result<Option<usize>> {
    check_alpha(alpha)?;
    if !(target_power > 0.0 && target_power < 1.0) {
        return Err(Error::InvalidValue(format!(
            "target power must be in (0, 1), got {}",
            target_power
        )));
    }

    // Power is monotone in n, so binary search over [2, max_n]
    if max_n < 2 || power_two_sample(effect_size, max_n, alpha)? < target_power {
        return Ok(None);
    }
    let (mut lo, mut hi) = (2, max_n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if power_two_sample(effect_size, mid, alpha)? >= target_power {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(Some(lo))
}

/// A point on a power curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerPoint {
    pub n_per_group: usize,
    pub power: f64,
}

/// Power at each per-group sample size in `sizes`.
pub fn power_curve(effect_size: f64, alpha: f64, sizes: &[usize]) -> Result<Vec<PowerPoint>> {
    sizes
        .iter()
        .map(|&n| {
            Ok(PowerPoint {
                n_per_group: n,
                power: power_two_sample(effect_size, n, alpha)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_values() {
        // d = 0.5, n = 64 per group → power ≈ 0.807 under the normal approximation
        let power = power_two_sample(0.5, 64, 0.05).unwrap();
        assert!((power - 0.807).abs() < 0.005);

        // No effect: power equals alpha
        let null_power = power_two_sample(0.0, 50, 0.05).unwrap();
        assert!((null_power - 0.05).abs() < 1e-6);

        assert!(power_two_sample(0.5, 10, 0.0).is_err());
    }

    #[test]
    fn test_required_sample_size() {
        let n = required_sample_size(0.5, 0.05, 0.8, 1000).unwrap().unwrap();
        assert_eq!(n, 63);
        assert!(power_two_sample(0.5, n, 0.05).unwrap() >= 0.8);
        assert!(power_two_sample(0.5, n - 1, 0.05).unwrap() < 0.8);

        assert_eq!(required_sample_size(0.0, 0.05, 0.8, 1000).unwrap(), None);
        assert_eq!(required_sample_size(0.2, 0.05, 0.8, 50).unwrap(), None);
        assert!(required_sample_size(0.5, 0.05, 1.2, 100).is_err());
    }

    #[test]
    fn test_power_curve_is_monotone() {
        let curve = power_curve(0.4, 0.05, &[5, 10, 20, 40, 80]).unwrap();
        assert!(curve.windows(2).all(|w| w[1].power > w[0].power));
    }
}

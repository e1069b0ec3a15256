// Inferential statistics and hypothesis tests

pub mod anova;

use crate::error::{check_alpha, Error, Result};
use crate::stats::descriptive::{mean, variance};
use crate::stats::distributions::t_two_tailed_p;
use crate::stats::{Degeneracy, Outcome, PairedTTestResult, TTestResult, VarianceKind};

/// Internal implementation of the two-sample t-test
pub(crate) fn ttest_impl(
    sample1: &[f64],
    sample2: &[f64],
    alpha: f64,
    equal_var: bool,
) -> Result<Outcome<TTestResult>> {
    check_alpha(alpha)?;

    let n1 = sample1.len();
    let n2 = sample2.len();

    let mean1 = mean(sample1);
    let mean2 = mean(sample2);
    let mean_difference = mean1 - mean2;

    let neutral = TTestResult {
        statistic: 0.0,
        p_value: 1.0,
        df: 0.0,
        mean_difference,
        standard_error: 0.0,
        significant: false,
    };

    if n1 < 2 || n2 < 2 {
        return Ok(Outcome::degenerate(
            neutral,
            Degeneracy::InsufficientData,
            "t-test",
        ));
    }

    let var1 = variance(sample1, VarianceKind::Sample);
    let var2 = variance(sample2, VarianceKind::Sample);
    let (n1f, n2f) = (n1 as f64, n2 as f64);

    let (standard_error, df) = if equal_var {
        let pooled_var = ((n1f - 1.0) * var1 + (n2f - 1.0) * var2) / (n1f + n2f - 2.0);
        ((pooled_var * (1.0 / n1f + 1.0 / n2f)).sqrt(), n1f + n2f - 2.0)
    } else {
        let v1 = var1 / n1f;
        let v2 = var2 / n2f;
        // Welch–Satterthwaite
        let df_num = (v1 + v2).powi(2);
        let df_denom = v1.powi(2) / (n1f - 1.0) + v2.powi(2) / (n2f - 1.0);
        let df = if df_denom > 0.0 { df_num / df_denom } else { 0.0 };
        ((v1 + v2).sqrt(), df)
    };

    if !(standard_error > 0.0) || !(df > 0.0) {
        return Ok(Outcome::degenerate(
            TTestResult { df, ..neutral },
            Degeneracy::ZeroVariance,
            "t-test",
        ));
    }

    let statistic = mean_difference / standard_error;
    let p_value = t_two_tailed_p(statistic, df);

    Ok(Outcome::Computed(TTestResult {
        statistic,
        p_value,
        df,
        mean_difference,
        standard_error,
        significant: p_value < alpha,
    }))
}

/// Internal implementation of the paired t-test
pub(crate) fn paired_t_test_impl(
    a: &[f64],
    b: &[f64],
    alpha: f64,
) -> Result<Outcome<PairedTTestResult>> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    check_alpha(alpha)?;

    let differences: Vec<f64> = a.iter().zip(b.iter()).map(|(&x, &y)| x - y).collect();
    let n = differences.len();
    let mean_difference = mean(&differences);
    let sd_difference = variance(&differences, VarianceKind::Sample).sqrt();

    let neutral = PairedTTestResult {
        statistic: 0.0,
        p_value: 1.0,
        df: n.saturating_sub(1),
        mean_difference,
        sd_difference,
        standard_error: 0.0,
        significant: false,
    };

    if n < 2 {
        return Ok(Outcome::degenerate(
            neutral,
            Degeneracy::InsufficientData,
            "paired t-test",
        ));
    }

    let standard_error = sd_difference / (n as f64).sqrt();
    if !(standard_error > 0.0) {
        return Ok(Outcome::degenerate(
            neutral,
            Degeneracy::ZeroVariance,
            "paired t-test",
        ));
    }

    let df = n - 1;
    let statistic = mean_difference / standard_error;
    let p_value = t_two_tailed_p(statistic, df as f64);

    Ok(Outcome::Computed(PairedTTestResult {
        statistic,
        p_value,
        df,
        mean_difference,
        sd_difference,
        standard_error,
        significant: p_value < alpha,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttest_equal_means() {
        let sample1 = vec![5.0, 6.0, 7.0, 8.0, 9.0];
        let sample2 = vec![6.0, 7.0, 8.0, 9.0, 10.0];

        let result = ttest_impl(&sample1, &sample2, 0.05, true).unwrap().into_value();

        // Difference of 1.0 against a spread of ~1.6 is not significant
        assert!((result.statistic + 1.0).abs() < 1e-10);
        assert!(result.p_value > 0.05);
        assert!(!result.significant);
        assert_eq!(result.df, 8.0);
    }

    #[test]
    fn test_ttest_different_means() {
        let sample1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let sample2 = vec![11.0, 12.0, 13.0, 14.0, 15.0];

        let result = ttest_impl(&sample1, &sample2, 0.05, true).unwrap().into_value();

        assert!(result.statistic < -5.0);
        assert!(result.p_value < 0.05);
        assert!(result.significant);
    }

    #[test]
    fn test_ttest_welch() {
        let sample1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let sample2 = vec![11.0, 13.0, 15.0, 17.0, 19.0];

        let result_equal_var = ttest_impl(&sample1, &sample2, 0.05, true).unwrap().into_value();
        let result_welch = ttest_impl(&sample1, &sample2, 0.05, false).unwrap().into_value();

        assert!(result_equal_var.significant);
        assert!(result_welch.significant);
        // var1 = 2.5, var2 = 10 → df = 5.8824
        assert!((result_welch.df - 5.882352941).abs() < 1e-6);
        assert!(result_equal_var.df != result_welch.df);
    }

    #[test]
    fn test_ttest_degenerate() {
        let sample1 = vec![1.0, 2.0, 3.0];
        let sample2: Vec<f64> = vec![];

        let result = ttest_impl(&sample1, &sample2, 0.05, true).unwrap();
        assert_eq!(result.degeneracy(), Some(Degeneracy::InsufficientData));
        assert_eq!(result.value().p_value, 1.0);

        let flat = ttest_impl(&[2.0, 2.0], &[2.0, 2.0], 0.05, false).unwrap();
        assert_eq!(flat.degeneracy(), Some(Degeneracy::ZeroVariance));
        assert_eq!(flat.value().statistic, 0.0);
    }

    #[test]
    fn test_ttest_rejects_bad_alpha() {
        assert!(ttest_impl(&[1.0, 2.0], &[3.0, 4.0], 1.5, true).is_err());
    }

    #[test]
    fn test_paired_t_test() {
        let before = vec![10.0, 12.0, 9.0, 11.0, 13.0];
        let after = vec![12.0, 14.0, 10.0, 14.0, 15.0];

        let result = paired_t_test_impl(&after, &before, 0.05).unwrap().into_value();
        // differences 2, 2, 1, 3, 2: mean 2, sd √0.5
        assert!((result.mean_difference - 2.0).abs() < 1e-12);
        assert!((result.sd_difference - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((result.statistic - 2.0 / (0.5_f64.sqrt() / 5.0_f64.sqrt())).abs() < 1e-9);
        assert_eq!(result.df, 4);
        assert!(result.significant);
    }

    #[test]
    fn test_paired_length_mismatch_is_error() {
        let err = paired_t_test_impl(&[1.0, 2.0, 3.0], &[1.0, 2.0], 0.05).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_paired_constant_difference_is_degenerate() {
        let result = paired_t_test_impl(&[3.0, 4.0, 5.0], &[1.0, 2.0, 3.0], 0.05).unwrap();
        assert_eq!(result.degeneracy(), Some(Degeneracy::ZeroVariance));
        assert_eq!(result.value().mean_difference, 2.0);
    }
}

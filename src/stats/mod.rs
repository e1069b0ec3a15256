// statlab statistics module
//
// Descriptive statistics, outlier screening, hypothesis tests, effect sizes,
// power, regression with moderation and mediation, sampling and sequential
// testing simulations.

pub mod descriptive;
pub mod distributions;
pub mod effect_size;
pub mod inference;
pub mod mediation;
pub mod outcome;
pub mod outliers;
pub mod power;
pub mod regression;
pub mod sampling;
pub mod sequential;

pub use descriptive::{iqr, mad, mean, median, quantile, standard_deviation, variance};
pub use outcome::{Degeneracy, Outcome};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Divisor used for variance and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarianceKind {
    /// Divide by n - 1 (unbiased estimator)
    Sample,
    /// Divide by n
    Population,
}

/// Summary statistics of one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of observations
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    pub min: f64,
    /// 25th percentile
    pub q1: f64,
    pub median: f64,
    /// 75th percentile
    pub q3: f64,
    pub max: f64,
}

/// Computes count, mean, standard deviation and the five-number summary.
///
/// # Example
/// ```rust
/// use statlab::stats;
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let summary = stats::describe(&data).unwrap();
/// assert_eq!(summary.median, 3.0);
/// ```
pub fn describe<T: AsRef<[f64]>>(data: T) -> Result<DescriptiveStats> {
    descriptive::describe_impl(data.as_ref())
}

/// One histogram bin, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Bins data into `bins` equal-width intervals spanning its range.
///
/// Empty data gives an empty histogram and constant data a single bin.
pub fn histogram<T: AsRef<[f64]>>(data: T, bins: usize) -> Result<Vec<HistogramBin>> {
    descriptive::histogram_impl(data.as_ref(), bins)
}

/// Sample covariance of two equally long series.
pub fn covariance<T: AsRef<[f64]>, U: AsRef<[f64]>>(x: T, y: U) -> Result<f64> {
    descriptive::covariance_impl(x.as_ref(), y.as_ref())
}

/// Pearson correlation coefficient.
pub fn correlation<T: AsRef<[f64]>, U: AsRef<[f64]>>(x: T, y: U) -> Result<f64> {
    descriptive::correlation_impl(x.as_ref(), y.as_ref())
}

/// Result of an independent two-sample t-test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TTestResult {
    /// t statistic (sample1 - sample2)
    pub statistic: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// Degrees of freedom (fractional for Welch)
    pub df: f64,
    pub mean_difference: f64,
    pub standard_error: f64,
    /// Whether p < alpha
    pub significant: bool,
}

/// Independent two-sample t-test.
///
/// With `equal_var` the pooled-variance Student test is used, otherwise
/// Welch's test with Welch–Satterthwaite degrees of freedom. A sample with
/// fewer than two observations, or zero standard error, yields a degenerate
/// result with t = 0 and p = 1.
///
/// # Example
/// ```rust
/// use statlab::stats;
///
/// let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let b = vec![3.0, 4.0, 5.0, 6.0, 7.0];
/// let result = stats::ttest(&a, &b, 0.05, false).unwrap();
/// assert!(result.value().statistic < 0.0);
/// ```
pub fn ttest<T: AsRef<[f64]>, U: AsRef<[f64]>>(
    sample1: T,
    sample2: U,
    alpha: f64,
    equal_var: bool,
) -> Result<Outcome<TTestResult>> {
    inference::ttest_impl(sample1.as_ref(), sample2.as_ref(), alpha, equal_var)
}

/// Welch's t-test at alpha = 0.05.
pub fn welch_t_test<T: AsRef<[f64]>, U: AsRef<[f64]>>(
    sample1: T,
    sample2: U,
) -> Result<Outcome<TTestResult>> {
    inference::ttest_impl(sample1.as_ref(), sample2.as_ref(), 0.05, false)
}

/// Result of a paired t-test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedTTestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub df: usize,
    /// Mean of (a - b)
    pub mean_difference: f64,
    /// Sample standard deviation of (a - b)
    pub sd_difference: f64,
    pub standard_error: f64,
    pub significant: bool,
}

/// Paired t-test on difference scores `a[i] - b[i]`.
///
/// Returns [`crate::error::Error::LengthMismatch`] when the samples differ in
/// length; this is the one hard precondition among the tests.
pub fn paired_t_test<T: AsRef<[f64]>, U: AsRef<[f64]>>(
    a: T,
    b: U,
    alpha: f64,
) -> Result<Outcome<PairedTTestResult>> {
    inference::paired_t_test_impl(a.as_ref(), b.as_ref(), alpha)
}

/// One-way analysis of variance result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaResult {
    pub f_statistic: f64,
    pub p_value: f64,
    /// Between-group sum of squares
    pub ss_between: f64,
    /// Within-group sum of squares
    pub ss_within: f64,
    pub ss_total: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub df_total: usize,
    pub ms_between: f64,
    pub ms_within: f64,
    pub eta_squared: f64,
    pub omega_squared: f64,
    pub grand_mean: f64,
    pub group_means: Vec<f64>,
    pub significant: bool,
}

/// One-way ANOVA across `groups`.
///
/// At least one group is required. Empty groups are skipped. When the
/// within-group variance or a degrees-of-freedom term is zero the result is
/// degenerate with F = 0 and p = 1.
///
/// # Example
/// ```rust
/// use statlab::stats;
///
/// let groups = vec![
///     vec![1.0, 2.0, 3.0, 4.0, 5.0],
///     vec![2.0, 3.0, 4.0, 5.0, 6.0],
///     vec![3.0, 4.0, 5.0, 6.0, 7.0],
/// ];
/// let result = stats::one_way_anova(&groups, 0.05).unwrap();
/// assert_eq!(result.value().df_between, 2);
/// ```
pub fn one_way_anova<T: AsRef<[f64]>>(groups: &[T], alpha: f64) -> Result<Outcome<AnovaResult>> {
    let groups: Vec<&[f64]> = groups.iter().map(|g| g.as_ref()).collect();
    inference::anova::one_way_anova_impl(&groups, alpha)
}

/// Sum of squares, degrees of freedom and mean square of one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceComponent {
    pub ss: f64,
    pub df: usize,
    pub ms: f64,
}

/// An effect tested against an error term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectTest {
    pub ss: f64,
    pub df: usize,
    pub ms: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub partial_eta_squared: f64,
    pub significant: bool,
    /// Set when the error term could not support this test; F and p are
    /// then the neutral 0 and 1.
    pub degeneracy: Option<Degeneracy>,
}

/// Repeated-measures (one within factor) ANOVA result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatedMeasuresAnovaResult {
    pub conditions: EffectTest,
    pub subjects: VarianceComponent,
    pub error: VarianceComponent,
    pub ss_total: f64,
    pub df_total: usize,
    pub condition_means: Vec<f64>,
}

/// Repeated-measures ANOVA; each row is one subject, each column one condition.
pub fn repeated_measures_anova(
    subjects: &[Vec<f64>],
    alpha: f64,
) -> Result<Outcome<RepeatedMeasuresAnovaResult>> {
    inference::anova::repeated_measures_anova_impl(subjects, alpha)
}

/// One observation in a split-plot design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedRecord {
    pub subject: String,
    /// Between-subjects factor level
    pub group: String,
    /// Within-subjects factor level
    pub time: String,
    pub value: f64,
}

impl MixedRecord {
    pub fn new(
        subject: impl Into<String>,
        group: impl Into<String>,
        time: impl Into<String>,
        value: f64,
    ) -> Self {
        MixedRecord {
            subject: subject.into(),
            group: group.into(),
            time: time.into(),
            value,
        }
    }
}

/// Mean of one group × time cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellMean {
    pub group: String,
    pub time: String,
    pub mean: f64,
}

/// Mixed (split-plot) ANOVA result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixedAnovaResult {
    /// Between-subjects effect, tested against subjects within groups
    pub group: EffectTest,
    pub subjects_within_groups: VarianceComponent,
    /// Within-subjects effect, tested against the residual
    pub time: EffectTest,
    pub interaction: EffectTest,
    pub error: VarianceComponent,
    pub ss_total: f64,
    pub df_total: usize,
    pub grand_mean: f64,
    pub cell_means: Vec<CellMean>,
}

/// Mixed ANOVA with one between factor (`group`) and one within factor (`time`).
///
/// Each [`EffectTest`] carries its own degeneracy. The outcome as a whole is
/// degenerate only when none of the three tests could be computed.
///
/// The design must be balanced: equal subjects per group and exactly one
/// value per subject and time level. Anything else is rejected with
/// [`crate::error::Error::UnbalancedDesign`].
pub fn mixed_anova(records: &[MixedRecord], alpha: f64) -> Result<Outcome<MixedAnovaResult>> {
    inference::anova::mixed_anova_impl(records, alpha)
}

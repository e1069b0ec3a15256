// Descriptive statistics module

use crate::error::{Error, Result};
use crate::stats::{DescriptiveStats, HistogramBin, VarianceKind};

/// Arithmetic mean, 0 for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sum of squared deviations from the mean.
pub fn sum_of_squares(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum()
}

/// Variance; 0 when there are too few observations for the requested kind.
pub fn variance(data: &[f64], kind: VarianceKind) -> f64 {
    let n = data.len();
    let denominator = match kind {
        VarianceKind::Sample if n < 2 => return 0.0,
        VarianceKind::Sample => (n - 1) as f64,
        VarianceKind::Population if n == 0 => return 0.0,
        VarianceKind::Population => n as f64,
    };
    sum_of_squares(data) / denominator
}

pub fn standard_deviation(data: &[f64], kind: VarianceKind) -> f64 {
    variance(data, kind).sqrt()
}

/// Returns a sorted copy of the data.
pub(crate) fn sorted(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Percentile of already sorted data by linear interpolation at `p * (n - 1)`.
pub(crate) fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let n = sorted_data.len();
    let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let idx_floor = idx.floor() as usize;
    let idx_ceil = idx.ceil() as usize;

    if idx_floor == idx_ceil {
        return sorted_data[idx_floor];
    }

    let weight_ceil = idx - idx_floor as f64;
    let weight_floor = 1.0 - weight_ceil;

    sorted_data[idx_floor] * weight_floor + sorted_data[idx_ceil] * weight_ceil
}

/// Quantile `p` (0..=1) of unsorted data, 0 for empty input.
pub fn quantile(data: &[f64], p: f64) -> f64 {
    percentile(&sorted(data), p)
}

pub fn median(data: &[f64]) -> f64 {
    quantile(data, 0.5)
}

/// Interquartile range Q3 - Q1.
pub fn iqr(data: &[f64]) -> f64 {
    let sorted = sorted(data);
    percentile(&sorted, 0.75) - percentile(&sorted, 0.25)
}

/// Median absolute deviation from the median (unscaled).
pub fn mad(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let med = median(data);
    let deviations: Vec<f64> = data.iter().map(|&x| (x - med).abs()).collect();
    median(&deviations)
}

/// Internal implementation of histogram binning
pub(crate) fn histogram_impl(data: &[f64], bins: usize) -> Result<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(Error::InvalidValue("histogram needs at least one bin".into()));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        return Ok(vec![HistogramBin {
            start: min,
            end: max,
            count: data.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &x in data {
        // The maximum belongs to the last (closed) bin
        let idx = (((x - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + i as f64 * width,
            end: if i + 1 == bins { max } else { min + (i + 1) as f64 * width },
            count,
        })
        .collect())
}

/// Internal implementation of descriptive statistics
pub(crate) fn describe_impl(data: &[f64]) -> Result<DescriptiveStats> {
    if data.is_empty() {
        return Err(Error::EmptyData(
            "descriptive statistics need at least one observation".into(),
        ));
    }

    let count = data.len();
    let sorted = sorted(data);

    Ok(DescriptiveStats {
        count,
        mean: mean(data),
        std: standard_deviation(data, VarianceKind::Sample),
        min: sorted[0],
        q1: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q3: percentile(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

fn check_pair(x: &[f64], y: &[f64], what: &str) -> Result<()> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch(format!(
            "{}: lengths differ: x={}, y={}",
            what,
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(Error::EmptyData(format!("{} requires data", what)));
    }
    if x.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "{} requires at least two data points",
            what
        )));
    }
    Ok(())
}

/// Internal implementation of sample covariance
pub(crate) fn covariance_impl(x: &[f64], y: &[f64]) -> Result<f64> {
    check_pair(x, y, "covariance")?;

    let n = x.len();
    let mean_x = mean(x);
    let mean_y = mean(y);

    let cov = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - mean_x) * (yi - mean_y))
        .sum::<f64>()
        / (n - 1) as f64;

    Ok(cov)
}

/// Internal implementation of the Pearson correlation coefficient
pub(crate) fn correlation_impl(x: &[f64], y: &[f64]) -> Result<f64> {
    check_pair(x, y, "correlation")?;

    let mean_x = mean(x);
    let mean_y = mean(y);

    // Σ(xi - x̄)(yi - ȳ)
    let numerator = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - mean_x) * (yi - mean_y))
        .sum::<f64>();

    // √[Σ(xi - x̄)² * Σ(yi - ȳ)²]
    let denominator = (sum_of_squares(x) * sum_of_squares(y)).sqrt();

    if denominator.abs() < f64::EPSILON {
        return Err(Error::ComputationError(
            "correlation: one of the variables has zero variance".into(),
        ));
    }

    Ok(numerator / denominator)
}

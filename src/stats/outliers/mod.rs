//! Outlier screening.
//!
//! Three rules are supported, each expressed as a pair of bounds:
//!
//! - **IQR**: `[Q1 - k·IQR, Q3 + k·IQR]`
//! - **z-score**: `mean ± t·SD`
//! - **MAD**: `median ± t·MAD / 0.6745` (modified z-score)
//!
//! With several groups the bounds can be computed separately for each group
//! ([`OutlierScope::Within`]) or once on the pooled data and shared by every
//! group ([`OutlierScope::Across`]). The two scopes routinely flag different
//! points, which changes the outcome of any test run after exclusion.

use serde::{Deserialize, Serialize};

use crate::stats::descriptive::{mad, mean, median, percentile, sorted, standard_deviation};
use crate::stats::{MixedRecord, VarianceKind};

/// Scale that makes the MAD consistent with the normal SD.
const MAD_CONSISTENCY: f64 = 0.6745;

/// Rule used to flag outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr { multiplier: f64 },
    ZScore { threshold: f64 },
    Mad { threshold: f64 },
}

impl OutlierMethod {
    pub fn iqr() -> Self {
        OutlierMethod::Iqr { multiplier: 1.5 }
    }

    pub fn z_score() -> Self {
        OutlierMethod::ZScore { threshold: 3.0 }
    }

    pub fn mad() -> Self {
        OutlierMethod::Mad { threshold: 3.5 }
    }
}

/// Whether bounds are computed per group or on the pooled data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierScope {
    Within,
    Across,
}

/// Values strictly outside `[lower, upper]` are outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Indices of values outside the bounds, ascending.
    pub fn flag(&self, data: &[f64]) -> Vec<usize> {
        data.iter()
            .enumerate()
            .filter(|&(_, &x)| !self.contains(x))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Bounds for `data` under `method`.
///
/// `None` when there is no data or no spread to scale by; nothing can be
/// flagged in that case.
pub fn outlier_bounds(data: &[f64], method: OutlierMethod) -> Option<OutlierBounds> {
    if data.is_empty() {
        return None;
    }
    let (center_low, center_high, spread, scale) = match method {
        OutlierMethod::Iqr { multiplier } => {
            let sorted = sorted(data);
            let q1 = percentile(&sorted, 0.25);
            let q3 = percentile(&sorted, 0.75);
            (q1, q3, q3 - q1, multiplier)
        }
        OutlierMethod::ZScore { threshold } => {
            let m = mean(data);
            (m, m, standard_deviation(data, VarianceKind::Sample), threshold)
        }
        OutlierMethod::Mad { threshold } => {
            let med = median(data);
            (med, med, mad(data) / MAD_CONSISTENCY, threshold)
        }
    };

    if !(spread > 0.0) {
        return None;
    }
    Some(OutlierBounds {
        lower: center_low - scale * spread,
        upper: center_high + scale * spread,
    })
}

/// Indices flagged by `method` in a single sample.
pub fn identify_outliers(data: &[f64], method: OutlierMethod) -> Vec<usize> {
    outlier_bounds(data, method)
        .map(|bounds| bounds.flag(data))
        .unwrap_or_default()
}

pub fn identify_outliers_iqr(data: &[f64], multiplier: f64) -> Vec<usize> {
    identify_outliers(data, OutlierMethod::Iqr { multiplier })
}

pub fn identify_outliers_zscore(data: &[f64], threshold: f64) -> Vec<usize> {
    identify_outliers(data, OutlierMethod::ZScore { threshold })
}

pub fn identify_outliers_mad(data: &[f64], threshold: f64) -> Vec<usize> {
    identify_outliers(data, OutlierMethod::Mad { threshold })
}

/// Per-group outlier indices with bounds computed inside each group.
pub fn identify_outliers_within<T: AsRef<[f64]>>(
    groups: &[T],
    method: OutlierMethod,
) -> Vec<Vec<usize>> {
    groups
        .iter()
        .map(|g| identify_outliers(g.as_ref(), method))
        .collect()
}

/// Per-group outlier indices with bounds computed once on the pooled data.
pub fn identify_outliers_across<T: AsRef<[f64]>>(
    groups: &[T],
    method: OutlierMethod,
) -> Vec<Vec<usize>> {
    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.as_ref().iter().copied()).collect();
    match outlier_bounds(&pooled, method) {
        Some(bounds) => groups.iter().map(|g| bounds.flag(g.as_ref())).collect(),
        None => vec![Vec::new(); groups.len()],
    }
}

/// Dispatches on `scope`.
pub fn identify_outliers_grouped<T: AsRef<[f64]>>(
    groups: &[T],
    method: OutlierMethod,
    scope: OutlierScope,
) -> Vec<Vec<usize>> {
    match scope {
        OutlierScope::Within => identify_outliers_within(groups, method),
        OutlierScope::Across => identify_outliers_across(groups, method),
    }
}

/// Copy of `data` without the positions listed in `indices`.
pub fn remove_outliers(data: &[f64], indices: &[usize]) -> Vec<f64> {
    data.iter()
        .enumerate()
        .filter(|(i, _)| !indices.contains(i))
        .map(|(_, &x)| x)
        .collect()
}

/// Removes outliers from every group under the given scope.
pub fn clean_groups<T: AsRef<[f64]>>(
    groups: &[T],
    method: OutlierMethod,
    scope: OutlierScope,
) -> Vec<Vec<f64>> {
    let flagged = identify_outliers_grouped(groups, method, scope);
    groups
        .iter()
        .zip(flagged.iter())
        .map(|(g, idx)| remove_outliers(g.as_ref(), idx))
        .collect()
}

/// Flags records of a mixed design, treating each `time` level as a condition.
///
/// Returns indices into `records`, ascending.
pub fn identify_record_outliers(
    records: &[MixedRecord],
    method: OutlierMethod,
    scope: OutlierScope,
) -> Vec<usize> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let idx = match conditions.iter().position(|&c| c == record.time) {
            Some(idx) => idx,
            None => {
                conditions.push(&record.time);
                members.push(Vec::new());
                conditions.len() - 1
            }
        };
        members[idx].push(i);
    }

    let groups: Vec<Vec<f64>> = members
        .iter()
        .map(|idx| idx.iter().map(|&i| records[i].value).collect())
        .collect();

    let mut flagged: Vec<usize> = identify_outliers_grouped(&groups, method, scope)
        .into_iter()
        .zip(members.iter())
        .flat_map(|(local, idx)| local.into_iter().map(move |j| idx[j]).collect::<Vec<_>>())
        .collect();
    flagged.sort_unstable();
    flagged
}

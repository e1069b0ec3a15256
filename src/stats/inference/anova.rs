// Analysis of variance: one-way, repeated measures and mixed designs

use crate::error::{check_alpha, Error, Result};
use crate::stats::descriptive::mean;
use crate::stats::distributions::f_upper_tail_p;
use crate::stats::effect_size::{eta_squared, omega_squared, partial_eta_squared};
use crate::stats::{
    AnovaResult, CellMean, Degeneracy, EffectTest, MixedAnovaResult, MixedRecord, Outcome,
    RepeatedMeasuresAnovaResult, VarianceComponent,
};

fn component(ss: f64, df: usize) -> VarianceComponent {
    let ms = if df > 0 { ss / df as f64 } else { 0.0 };
    VarianceComponent { ss, df, ms }
}

/// Tests an effect against an error term. F = 0 and p = 1 when the error
/// term cannot support a test.
fn effect_test(
    effect: &VarianceComponent,
    error: &VarianceComponent,
    alpha: f64,
) -> EffectTest {
    let degeneracy = if effect.df == 0 || error.df == 0 {
        Some(Degeneracy::InsufficientDegreesOfFreedom)
    } else if !(error.ms > 0.0) {
        Some(Degeneracy::ZeroVariance)
    } else {
        None
    };

    let (f_statistic, p_value) = match degeneracy {
        Some(_) => (0.0, 1.0),
        None => {
            let f = effect.ms / error.ms;
            (f, f_upper_tail_p(f, effect.df as f64, error.df as f64))
        }
    };

    EffectTest {
        ss: effect.ss,
        df: effect.df,
        ms: effect.ms,
        f_statistic,
        p_value,
        partial_eta_squared: partial_eta_squared(effect.ss, error.ss),
        significant: degeneracy.is_none() && p_value < alpha,
        degeneracy,
    }
}

/// Internal implementation of one-way ANOVA
pub(crate) fn one_way_anova_impl(groups: &[&[f64]], alpha: f64) -> Result<Outcome<AnovaResult>> {
    if groups.is_empty() {
        return Err(Error::EmptyData(
            "analysis of variance needs at least one group".into(),
        ));
    }
    check_alpha(alpha)?;

    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let total_n: usize = groups.iter().map(|g| g.len()).sum();

    let global_sum: f64 = groups.iter().flat_map(|g| g.iter()).sum();
    let grand_mean = if total_n > 0 {
        global_sum / total_n as f64
    } else {
        0.0
    };
    let group_means: Vec<f64> = groups.iter().map(|g| mean(g)).collect();

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    let mut ss_total = 0.0;

    for (values, &group_mean) in groups.iter().zip(group_means.iter()) {
        ss_between += values.len() as f64 * (group_mean - grand_mean).powi(2);
        for &value in values.iter() {
            ss_within += (value - group_mean).powi(2);
            ss_total += (value - grand_mean).powi(2);
        }
    }

    let df_between = k.saturating_sub(1);
    let df_within = total_n.saturating_sub(k);
    let df_total = total_n.saturating_sub(1);

    let between = component(ss_between, df_between);
    let within = component(ss_within, df_within);

    let mut result = AnovaResult {
        f_statistic: 0.0,
        p_value: 1.0,
        ss_between,
        ss_within,
        ss_total,
        df_between,
        df_within,
        df_total,
        ms_between: between.ms,
        ms_within: within.ms,
        eta_squared: eta_squared(ss_between, ss_total),
        omega_squared: omega_squared(ss_between, df_between, within.ms, ss_total),
        grand_mean,
        group_means,
        significant: false,
    };

    if total_n == 0 {
        return Ok(Outcome::degenerate(
            result,
            Degeneracy::InsufficientData,
            "one-way ANOVA",
        ));
    }

    let test = effect_test(&between, &within, alpha);
    if let Some(reason) = test.degeneracy {
        return Ok(Outcome::degenerate(result, reason, "one-way ANOVA"));
    }

    result.f_statistic = test.f_statistic;
    result.p_value = test.p_value;
    result.significant = test.significant;
    Ok(Outcome::Computed(result))
}

/// Internal implementation of repeated-measures ANOVA
pub(crate) fn repeated_measures_anova_impl(
    subjects: &[Vec<f64>],
    alpha: f64,
) -> Result<Outcome<RepeatedMeasuresAnovaResult>> {
    if subjects.is_empty() {
        return Err(Error::EmptyData(
            "repeated-measures ANOVA needs at least one subject".into(),
        ));
    }
    check_alpha(alpha)?;

    let k = subjects[0].len();
    if k == 0 {
        return Err(Error::EmptyData(
            "repeated-measures ANOVA needs at least one condition".into(),
        ));
    }
    if let Some(row) = subjects.iter().find(|row| row.len() != k) {
        return Err(Error::DimensionMismatch(format!(
            "every subject needs {} measurements, found a subject with {}",
            k,
            row.len()
        )));
    }

    let n = subjects.len();
    let all: Vec<f64> = subjects.iter().flatten().copied().collect();
    let grand_mean = mean(&all);

    let subject_means: Vec<f64> = subjects.iter().map(|row| mean(row)).collect();
    let condition_means: Vec<f64> = (0..k)
        .map(|j| subjects.iter().map(|row| row[j]).sum::<f64>() / n as f64)
        .collect();

    let ss_total: f64 = all.iter().map(|&x| (x - grand_mean).powi(2)).sum();
    let ss_conditions = n as f64
        * condition_means
            .iter()
            .map(|&m| (m - grand_mean).powi(2))
            .sum::<f64>();
    let ss_subjects = k as f64
        * subject_means
            .iter()
            .map(|&m| (m - grand_mean).powi(2))
            .sum::<f64>();

    // Residual computed directly so that an additive layout gives exactly 0
    let mut ss_error = 0.0;
    for (row, &subject_mean) in subjects.iter().zip(subject_means.iter()) {
        for (&x, &condition_mean) in row.iter().zip(condition_means.iter()) {
            ss_error += (x - subject_mean - condition_mean + grand_mean).powi(2);
        }
    }

    let conditions = component(ss_conditions, k - 1);
    let subjects_component = component(ss_subjects, n - 1);
    let error = component(ss_error, (k - 1) * (n - 1));

    let test = effect_test(&conditions, &error, alpha);
    let degeneracy = test.degeneracy;

    let result = RepeatedMeasuresAnovaResult {
        conditions: test,
        subjects: subjects_component,
        error,
        ss_total,
        df_total: n * k - 1,
        condition_means,
    };

    Ok(match degeneracy {
        Some(reason) => Outcome::degenerate(result, reason, "repeated-measures ANOVA"),
        None => Outcome::Computed(result),
    })
}

/// Position of `label` in `labels`, appending it when new.
fn level_index(labels: &mut Vec<String>, label: &str) -> usize {
    match labels.iter().position(|l| l == label) {
        Some(idx) => idx,
        None => {
            labels.push(label.to_string());
            labels.len() - 1
        }
    }
}

/// Balanced split-plot layout extracted from flat records.
struct MixedLayout {
    groups: Vec<String>,
    times: Vec<String>,
    /// Subjects per group, each as a row of values indexed by time level
    cells: Vec<Vec<Vec<f64>>>,
}

fn mixed_layout(records: &[MixedRecord]) -> Result<MixedLayout> {
    let mut groups: Vec<String> = Vec::new();
    let mut times: Vec<String> = Vec::new();
    let mut subjects: Vec<String> = Vec::new();
    let mut subject_group: Vec<usize> = Vec::new();

    for record in records {
        let group = level_index(&mut groups, &record.group);
        level_index(&mut times, &record.time);
        let subject = level_index(&mut subjects, &record.subject);
        if subject == subject_group.len() {
            subject_group.push(group);
        } else if subject_group[subject] != group {
            return Err(Error::UnbalancedDesign(format!(
                "subject '{}' appears in groups '{}' and '{}'",
                record.subject, groups[subject_group[subject]], record.group
            )));
        }
    }

    let b = times.len();
    let mut values: Vec<Vec<Option<f64>>> = vec![vec![None; b]; subjects.len()];
    for record in records {
        let subject = level_index(&mut subjects, &record.subject);
        let time = level_index(&mut times, &record.time);
        if values[subject][time].replace(record.value).is_some() {
            return Err(Error::UnbalancedDesign(format!(
                "subject '{}' has more than one value at time '{}'",
                record.subject, record.time
            )));
        }
    }

    let mut cells: Vec<Vec<Vec<f64>>> = vec![Vec::new(); groups.len()];
    for (subject, row) in values.into_iter().enumerate() {
        let row: Option<Vec<f64>> = row.into_iter().collect();
        match row {
            Some(row) => cells[subject_group[subject]].push(row),
            None => {
                return Err(Error::UnbalancedDesign(format!(
                    "subject '{}' is missing a value for at least one time level",
                    subjects[subject]
                )))
            }
        }
    }

    let per_group = cells[0].len();
    if let Some((idx, group)) = cells
        .iter()
        .enumerate()
        .find(|(_, group)| group.len() != per_group)
    {
        return Err(Error::UnbalancedDesign(format!(
            "group '{}' has {} subjects, group '{}' has {}",
            groups[0],
            per_group,
            groups[idx],
            group.len()
        )));
    }

    Ok(MixedLayout {
        groups,
        times,
        cells,
    })
}

/// Internal implementation of the mixed (split-plot) ANOVA
pub(crate) fn mixed_anova_impl(
    records: &[MixedRecord],
    alpha: f64,
) -> Result<Outcome<MixedAnovaResult>> {
    if records.is_empty() {
        return Err(Error::EmptyData("mixed ANOVA needs observations".into()));
    }
    check_alpha(alpha)?;

    let layout = mixed_layout(records)?;
    let a = layout.groups.len();
    let b = layout.times.len();
    let n = layout.cells[0].len();
    let (af, bf, nf) = (a as f64, b as f64, n as f64);

    let grand_mean = mean(&records.iter().map(|r| r.value).collect::<Vec<_>>());

    let group_means: Vec<f64> = layout
        .cells
        .iter()
        .map(|subjects| subjects.iter().flatten().sum::<f64>() / (nf * bf))
        .collect();
    let time_means: Vec<f64> = (0..b)
        .map(|t| {
            layout
                .cells
                .iter()
                .flat_map(|subjects| subjects.iter().map(move |row| row[t]))
                .sum::<f64>()
                / (af * nf)
        })
        .collect();
    let cell_mean = |g: usize, t: usize| -> f64 {
        layout.cells[g].iter().map(|row| row[t]).sum::<f64>() / nf
    };

    let mut ss_total = 0.0;
    let mut ss_subjects = 0.0;
    let mut ss_error = 0.0;
    for (g, subjects) in layout.cells.iter().enumerate() {
        for row in subjects {
            let subject_mean = mean(row);
            ss_subjects += bf * (subject_mean - group_means[g]).powi(2);
            for (t, &x) in row.iter().enumerate() {
                ss_total += (x - grand_mean).powi(2);
                ss_error += (x - cell_mean(g, t) - subject_mean + group_means[g]).powi(2);
            }
        }
    }

    let ss_group = nf * bf * group_means.iter().map(|&m| (m - grand_mean).powi(2)).sum::<f64>();
    let ss_time = af * nf * time_means.iter().map(|&m| (m - grand_mean).powi(2)).sum::<f64>();

    let mut ss_interaction = 0.0;
    let mut cell_means = Vec::with_capacity(a * b);
    for g in 0..a {
        for t in 0..b {
            let m = cell_mean(g, t);
            ss_interaction += nf * (m - group_means[g] - time_means[t] + grand_mean).powi(2);
            cell_means.push(CellMean {
                group: layout.groups[g].clone(),
                time: layout.times[t].clone(),
                mean: m,
            });
        }
    }

    let group = component(ss_group, a - 1);
    let subjects_within_groups = component(ss_subjects, a * (n - 1));
    let time = component(ss_time, b - 1);
    let interaction = component(ss_interaction, (a - 1) * (b - 1));
    let error = component(ss_error, a * (n - 1) * (b - 1));

    let group_test = effect_test(&group, &subjects_within_groups, alpha);
    let time_test = effect_test(&time, &error, alpha);
    let interaction_test = effect_test(&interaction, &error, alpha);

    // Only a result with no usable test at all is degenerate as a whole
    let degeneracy = match (
        group_test.degeneracy,
        time_test.degeneracy,
        interaction_test.degeneracy,
    ) {
        (Some(reason), Some(_), Some(_)) => Some(reason),
        _ => None,
    };

    let result = MixedAnovaResult {
        group: group_test,
        subjects_within_groups,
        time: time_test,
        interaction: interaction_test,
        error,
        ss_total,
        df_total: a * b * n - 1,
        grand_mean,
        cell_means,
    };

    Ok(match degeneracy {
        Some(reason) => Outcome::degenerate(result, reason, "mixed ANOVA"),
        None => {
            for (name, test) in [
                ("group", &result.group),
                ("time", &result.time),
                ("interaction", &result.interaction),
            ] {
                if let Some(reason) = test.degeneracy {
                    log::debug!("mixed ANOVA: {} test not computed ({})", name, reason);
                }
            }
            Outcome::Computed(result)
        }
    })
}

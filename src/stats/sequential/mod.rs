//! Sequential testing with pre-registered interim analyses (PRIAD).
//!
//! A two-arm trial is analysed after every stage of `n_per_stage`
//! observations per arm and stops as soon as the Welch p-value falls below
//! the nominal threshold of that look. Testing at the unadjusted alpha at
//! every look ([`BoundaryKind::Naive`]) inflates the Type I error rate;
//! Pocock and O'Brien–Fleming thresholds keep it at alpha.

pub mod state;

pub use state::{reduce, PriadAction, PriadState, SimulationStatus};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_alpha, Error, Result};
use crate::stats::effect_size::cohens_d;
use crate::stats::inference::ttest_impl;

/// Largest number of looks with tabled thresholds.
pub const MAX_STAGES: usize = 5;

/// Overall alpha the Pocock and O'Brien–Fleming tables are built for.
const TABLED_ALPHA: f64 = 0.05;

/// Nominal per-look p thresholds, two-sided α = .05, by number of looks.
const POCOCK_THRESHOLDS: [f64; MAX_STAGES] = [0.05, 0.0294, 0.0221, 0.0182, 0.0158];

const OBRIEN_FLEMING_THRESHOLDS: [&[f64]; MAX_STAGES] = [
    &[0.05],
    &[0.0054, 0.0492],
    &[0.0005, 0.0141, 0.0451],
    &[0.0001, 0.0042, 0.0194, 0.0430],
    &[0.00001, 0.0013, 0.0085, 0.0228, 0.0417],
];

/// Stopping boundary family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Same threshold at every look
    #[default]
    Pocock,
    /// Very strict early, close to alpha at the final look
    OBrienFleming,
    /// Unadjusted alpha at every look
    Naive,
}

/// Nominal p-value threshold for each of `stages` looks.
///
/// Pocock and O'Brien–Fleming are tabled for 1 to 5 looks at α = .05 only.
pub fn stage_thresholds(kind: BoundaryKind, stages: usize, alpha: f64) -> Result<Vec<f64>> {
    check_alpha(alpha)?;
    if stages == 0 || stages > MAX_STAGES {
        return Err(Error::InvalidInput(format!(
            "number of stages must be between 1 and {}, got {}",
            MAX_STAGES, stages
        )));
    }

    match kind {
        BoundaryKind::Naive => Ok(vec![alpha; stages]),
        BoundaryKind::Pocock | BoundaryKind::OBrienFleming => {
            if (alpha - TABLED_ALPHA).abs() > 1e-9 {
                return Err(Error::InvalidValue(format!(
                    "{:?} thresholds are tabled for alpha = {} only, got {}",
                    kind, TABLED_ALPHA, alpha
                )));
            }
            Ok(match kind {
                BoundaryKind::Pocock => vec![POCOCK_THRESHOLDS[stages - 1]; stages],
                _ => OBRIEN_FLEMING_THRESHOLDS[stages - 1].to_vec(),
            })
        }
    }
}

/// Parameters of one simulated sequential trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialConfig {
    /// True standardized mean difference; 0 simulates the null
    pub effect_size: f64,
    pub n_per_stage: usize,
    pub stages: usize,
    pub boundary: BoundaryKind,
    pub alpha: f64,
}

impl Default for SequentialConfig {
    fn default() -> Self {
        SequentialConfig {
            effect_size: 0.5,
            n_per_stage: 20,
            stages: 3,
            boundary: BoundaryKind::Pocock,
            alpha: 0.05,
        }
    }
}

impl SequentialConfig {
    /// Thresholds for this configuration; also validates it.
    pub fn thresholds(&self) -> Result<Vec<f64>> {
        if self.n_per_stage < 2 {
            return Err(Error::InvalidValue(format!(
                "n_per_stage must be at least 2, got {}",
                self.n_per_stage
            )));
        }
        if !self.effect_size.is_finite() {
            return Err(Error::InvalidValue("effect size must be finite".into()));
        }
        stage_thresholds(self.boundary, self.stages, self.alpha)
    }

    /// Per-arm sample size if the trial never stops early.
    pub fn max_n_per_group(&self) -> usize {
        self.n_per_stage * self.stages
    }
}

/// Result of one simulated trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub rejected: bool,
    /// 1-based look at which the trial ended
    pub stopped_at_stage: usize,
    pub n_per_group: usize,
    /// p-value observed at each look performed
    pub p_values: Vec<f64>,
    /// Cohen's d at the final look
    pub observed_effect: f64,
}

/// Runs one sequential trial.
pub fn simulate_sequential_test<R: Rng + ?Sized>(config: &SequentialConfig, rng: &mut R) -> Result<TrialOutcome> {
    let thresholds = config.thresholds()?;
    simulate_with_thresholds(config, &thresholds, rng)
}

fn simulate_with_thresholds<R: Rng + ?Sized>(
    config: &SequentialConfig,
    thresholds: &[f64],
    rng: &mut R,
) -> Result<TrialOutcome> {
    let control_dist = Normal::new(0.0, 1.0).map_err(|e| Error::ComputationError(e.to_string()))?;
    let treatment_dist =
        Normal::new(config.effect_size, 1.0).map_err(|e| Error::ComputationError(e.to_string()))?;

    let capacity = config.max_n_per_group();
    let mut control = Vec::with_capacity(capacity);
    let mut treatment = Vec::with_capacity(capacity);
    let mut p_values = Vec::with_capacity(thresholds.len());

    for (stage, &threshold) in thresholds.iter().enumerate() {
        control.extend((0..config.n_per_stage).map(|_| control_dist.sample(rng)));
        treatment.extend((0..config.n_per_stage).map(|_| treatment_dist.sample(rng)));

        let p_value = ttest_impl(&treatment, &control, config.alpha, false)?
            .value()
            .p_value;
        p_values.push(p_value);

        if p_value < threshold || stage + 1 == thresholds.len() {
            return Ok(TrialOutcome {
                rejected: p_value < threshold,
                stopped_at_stage: stage + 1,
                n_per_group: control.len(),
                p_values,
                observed_effect: cohens_d(&treatment, &control),
            });
        }
    }

    Err(Error::ComputationError("sequential trial ran without any look".into()))
}

/// Aggregate of many simulated trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub n_simulations: usize,
    pub rejections: usize,
    /// Empirical power, or Type I error rate when the effect is 0
    pub rejection_rate: f64,
    pub mean_n_per_group: f64,
    /// Per-arm size of the same design without interim looks
    pub max_n_per_group: usize,
    /// Share of the fixed-design sample saved by stopping early
    pub expected_savings: f64,
    /// Rejections at each look
    pub rejections_per_stage: Vec<usize>,
}

impl SimulationSummary {
    pub fn from_trials(config: &SequentialConfig, trials: &[TrialOutcome]) -> Self {
        let n_simulations = trials.len();
        let mut rejections_per_stage = vec![0; config.stages];
        for trial in trials.iter().filter(|t| t.rejected) {
            let stage = trial.stopped_at_stage.checked_sub(1);
            if let Some(count) = stage.and_then(|i| rejections_per_stage.get_mut(i)) {
                *count += 1;
            }
        }
        let rejections: usize = rejections_per_stage.iter().sum();

        let (rejection_rate, mean_n_per_group) = if n_simulations > 0 {
            (
                rejections as f64 / n_simulations as f64,
                trials.iter().map(|t| t.n_per_group as f64).sum::<f64>() / n_simulations as f64,
            )
        } else {
            (0.0, 0.0)
        };
        let max_n_per_group = config.max_n_per_group();
        let expected_savings = if max_n_per_group > 0 && n_simulations > 0 {
            1.0 - mean_n_per_group / max_n_per_group as f64
        } else {
            0.0
        };

        SimulationSummary {
            n_simulations,
            rejections,
            rejection_rate,
            mean_n_per_group,
            max_n_per_group,
            expected_savings,
            rejections_per_stage,
        }
    }
}

/// Runs `n_simulations` independent trials in parallel.
///
/// Trial `i` uses a generator seeded with `seed + i`, so the summary does
/// not depend on thread scheduling.
pub fn run_priad_simulation(config: &SequentialConfig, n_simulations: usize, seed: u64) -> Result<SimulationSummary> {
    if n_simulations == 0 {
        return Err(Error::InvalidValue("number of simulations must be positive".into()));
    }
    let thresholds = config.thresholds()?;

    log::debug!(
        "running {} sequential trials ({:?}, {} stages of {})",
        n_simulations,
        config.boundary,
        config.stages,
        config.n_per_stage
    );

    let trials: Vec<TrialOutcome> = (0..n_simulations)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            simulate_with_thresholds(config, &thresholds, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;

    let summary = SimulationSummary::from_trials(config, &trials);
    log::debug!(
        "sequential simulation finished: rejection rate {:.4}, mean n per group {:.1}",
        summary.rejection_rate,
        summary.mean_n_per_group
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_thresholds() {
        assert_eq!(stage_thresholds(BoundaryKind::Pocock, 3, 0.05).unwrap(), vec![0.0221; 3]);
        assert_eq!(
            stage_thresholds(BoundaryKind::OBrienFleming, 2, 0.05).unwrap(),
            vec![0.0054, 0.0492]
        );
        assert_eq!(stage_thresholds(BoundaryKind::Naive, 4, 0.1).unwrap(), vec![0.1; 4]);

        for stages in 1..=MAX_STAGES {
            let obf = stage_thresholds(BoundaryKind::OBrienFleming, stages, 0.05).unwrap();
            assert_eq!(obf.len(), stages);
            assert!(obf.windows(2).all(|w| w[0] < w[1]));
            assert!(obf.iter().all(|&p| p <= 0.05));
        }
    }

    #[test]
    fn test_stage_threshold_errors() {
        assert!(stage_thresholds(BoundaryKind::Pocock, 0, 0.05).is_err());
        assert!(stage_thresholds(BoundaryKind::Pocock, 6, 0.05).is_err());
        assert!(stage_thresholds(BoundaryKind::OBrienFleming, 3, 0.01).is_err());
        assert!(stage_thresholds(BoundaryKind::Naive, 3, 0.0).is_err());
    }

    #[test]
    fn test_single_trial() {
        let config = SequentialConfig {
            effect_size: 3.0,
            ..SequentialConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = simulate_sequential_test(&config, &mut rng).unwrap();
        // A huge effect is detected at the first look
        assert!(outcome.rejected);
        assert_eq!(outcome.stopped_at_stage, 1);
        assert_eq!(outcome.n_per_group, 20);
        assert_eq!(outcome.p_values.len(), 1);
    }

    #[test]
    fn test_trial_runs_to_completion_without_rejection() {
        let config = SequentialConfig {
            effect_size: 0.0,
            boundary: BoundaryKind::OBrienFleming,
            ..SequentialConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            let outcome = simulate_sequential_test(&config, &mut rng).unwrap();
            if !outcome.rejected {
                assert_eq!(outcome.stopped_at_stage, 3);
                assert_eq!(outcome.n_per_group, 60);
                assert_eq!(outcome.p_values.len(), 3);
            }
        }
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let config = SequentialConfig::default();
        let a = run_priad_simulation(&config, 200, 17).unwrap();
        let b = run_priad_simulation(&config, 200, 17).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rejections_per_stage.iter().sum::<usize>(), a.rejections);
        assert!(a.mean_n_per_group <= a.max_n_per_group as f64);
    }

    #[test]
    fn test_invalid_simulation() {
        assert!(run_priad_simulation(&SequentialConfig::default(), 0, 1).is_err());
        let config = SequentialConfig {
            n_per_stage: 1,
            ..SequentialConfig::default()
        };
        assert!(run_priad_simulation(&config, 10, 1).is_err());
    }
}

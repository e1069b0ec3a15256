//! Caller-owned state of a running PRIAD simulation.
//!
//! The state only changes through [`reduce`], which consumes the previous
//! state and an action and returns the next one. Actions that make no sense
//! in the current status are ignored and logged.

use serde::{Deserialize, Serialize};

use super::{SequentialConfig, SimulationSummary, TrialOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    #[default]
    Idle,
    Running,
    /// Stopped by the caller or after the target number of trials
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PriadAction {
    /// Replace the configuration; only accepted while not running
    Configure(SequentialConfig),
    /// Begin a run of `target_trials` trials, discarding earlier ones
    Start { target_trials: usize },
    RecordTrial(TrialOutcome),
    Stop,
    /// Back to idle, keeping the configuration
    Reset,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriadState {
    pub config: SequentialConfig,
    pub status: SimulationStatus,
    pub target_trials: usize,
    pub trials: Vec<TrialOutcome>,
}

impl PriadState {
    pub fn new(config: SequentialConfig) -> Self {
        PriadState {
            config,
            ..PriadState::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.target_trials > 0 && self.trials.len() >= self.target_trials
    }

    /// Fraction of the target already simulated, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.target_trials == 0 {
            0.0
        } else {
            (self.trials.len() as f64 / self.target_trials as f64).min(1.0)
        }
    }

    /// Summary of the trials recorded so far.
    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary::from_trials(&self.config, &self.trials)
    }
}

/// Applies `action` to `state`.
pub fn reduce(mut state: PriadState, action: PriadAction) -> PriadState {
    match action {
        PriadAction::Configure(config) => {
            if state.status == SimulationStatus::Running {
                log::warn!("ignoring configuration change while a simulation is running");
                return state;
            }
            PriadState::new(config)
        }
        PriadAction::Start { target_trials } => {
            if target_trials == 0 {
                log::warn!("ignoring start with zero target trials");
                return state;
            }
            PriadState {
                status: SimulationStatus::Running,
                target_trials,
                trials: Vec::with_capacity(target_trials),
                ..state
            }
        }
        PriadAction::RecordTrial(trial) => {
            if state.status != SimulationStatus::Running {
                log::warn!("ignoring trial recorded while {:?}", state.status);
                return state;
            }
            state.trials.push(trial);
            if state.is_complete() {
                state.status = SimulationStatus::Stopped;
            }
            state
        }
        PriadAction::Stop => {
            if state.status == SimulationStatus::Running {
                state.status = SimulationStatus::Stopped;
            }
            state
        }
        PriadAction::Reset => PriadState::new(state.config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::sequential::simulate_sequential_test;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trial(rejected: bool, stage: usize) -> TrialOutcome {
        TrialOutcome {
            rejected,
            stopped_at_stage: stage,
            n_per_group: 20 * stage,
            p_values: vec![0.5; stage],
            observed_effect: 0.3,
        }
    }

    #[test]
    fn test_lifecycle() {
        let state = PriadState::default();
        assert_eq!(state.status, SimulationStatus::Idle);

        let state = reduce(state, PriadAction::Start { target_trials: 2 });
        assert_eq!(state.status, SimulationStatus::Running);

        let state = reduce(state, PriadAction::RecordTrial(trial(true, 1)));
        assert_eq!(state.progress(), 0.5);
        let state = reduce(state, PriadAction::RecordTrial(trial(false, 3)));
        assert!(state.is_complete());
        assert_eq!(state.status, SimulationStatus::Stopped);

        let summary = state.summary();
        assert_eq!(summary.n_simulations, 2);
        assert_eq!(summary.rejections, 1);
        assert_eq!(summary.rejections_per_stage, vec![1, 0, 0]);
        assert!((summary.mean_n_per_group - 40.0).abs() < 1e-12);

        // Trials after completion are ignored
        let state = reduce(state, PriadAction::RecordTrial(trial(true, 1)));
        assert_eq!(state.trials.len(), 2);

        let state = reduce(state, PriadAction::Reset);
        assert_eq!(state.status, SimulationStatus::Idle);
        assert!(state.trials.is_empty());
    }

    #[test]
    fn test_configure_is_rejected_while_running() {
        let config = SequentialConfig {
            stages: 5,
            ..SequentialConfig::default()
        };
        let state = reduce(PriadState::default(), PriadAction::Start { target_trials: 10 });
        let state = reduce(state, PriadAction::Configure(config));
        assert_eq!(state.config.stages, 3);

        let state = reduce(state, PriadAction::Stop);
        let state = reduce(state, PriadAction::Configure(config));
        assert_eq!(state.config.stages, 5);
        assert_eq!(state.status, SimulationStatus::Idle);
    }

    #[test]
    fn test_driven_by_simulation() {
        let config = SequentialConfig::default();
        let mut state = reduce(PriadState::new(config), PriadAction::Start { target_trials: 25 });
        let mut rng = StdRng::seed_from_u64(8);
        while state.status == SimulationStatus::Running {
            let outcome = simulate_sequential_test(&state.config, &mut rng).unwrap();
            state = reduce(state, PriadAction::RecordTrial(outcome));
        }
        assert_eq!(state.trials.len(), 25);
        assert_eq!(state.progress(), 1.0);
        assert_eq!(state.summary().n_simulations, 25);
    }
}

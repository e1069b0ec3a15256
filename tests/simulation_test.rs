use statlab::stats::sampling::{
    draw_sample, generate_population, rng_from_seed, sampling_distribution_of_mean, PopulationShape,
};
use statlab::stats::sequential::{
    reduce, run_priad_simulation, simulate_sequential_test, BoundaryKind, PriadAction, PriadState,
    SequentialConfig, SimulationStatus,
};
use statlab::stats::{mean, standard_deviation, VarianceKind};

#[test]
fn test_normal_population_sample_means() {
    let mut rng = rng_from_seed(Some(50));
    let population = generate_population(PopulationShape::Normal, 50.0, 10.0, 500, &mut rng).unwrap();
    assert_eq!(population.len(), 500);

    let means: Vec<f64> = (0..400)
        .map(|_| mean(&draw_sample(&population, 30, &mut rng)))
        .collect();
    let observed = mean(&means);

    // Population mean is itself within a few standard errors of 50
    let standard_error = 10.0 / (500.0_f64).sqrt();
    assert!((mean(&population) - 50.0).abs() < 4.0 * standard_error);
    assert!((observed - 50.0).abs() < 4.0 * standard_error + 0.5);
}

#[test]
fn test_sampling_distribution_narrows_with_n() {
    let mut rng = rng_from_seed(Some(9));
    let population = generate_population(PopulationShape::Bimodal, 100.0, 15.0, 2000, &mut rng).unwrap();

    let small = sampling_distribution_of_mean(&population, 5, 1000, &mut rng).unwrap();
    let large = sampling_distribution_of_mean(&population, 80, 1000, &mut rng).unwrap();
    assert!(large.empirical_standard_error < small.empirical_standard_error / 2.0);
    assert!((small.theoretical_standard_error / large.theoretical_standard_error - 4.0).abs() < 1e-9);
    assert!(standard_deviation(&large.means, VarianceKind::Sample) > 0.0);
}

#[test]
fn test_naive_peeking_inflates_type_one_error() {
    let null = |boundary| SequentialConfig {
        effect_size: 0.0,
        n_per_stage: 20,
        stages: 5,
        boundary,
        alpha: 0.05,
    };

    let naive = run_priad_simulation(&null(BoundaryKind::Naive), 2000, 1).unwrap();
    let pocock = run_priad_simulation(&null(BoundaryKind::Pocock), 2000, 1).unwrap();
    let obf = run_priad_simulation(&null(BoundaryKind::OBrienFleming), 2000, 1).unwrap();

    // Five unadjusted looks give roughly 14% false positives
    assert!(naive.rejection_rate > 0.09);
    assert!(pocock.rejection_rate < 0.075);
    assert!(obf.rejection_rate < 0.075);
    assert!(naive.rejection_rate > pocock.rejection_rate);
}

#[test]
fn test_early_stopping_saves_sample_size_under_effect() {
    let config = SequentialConfig {
        effect_size: 0.8,
        n_per_stage: 15,
        stages: 4,
        boundary: BoundaryKind::OBrienFleming,
        alpha: 0.05,
    };
    let summary = run_priad_simulation(&config, 500, 77).unwrap();
    assert!(summary.rejection_rate > 0.9);
    assert!(summary.mean_n_per_group < 60.0);
    assert!(summary.expected_savings > 0.0);
    assert_eq!(summary.rejections_per_stage.len(), 4);
}

#[test]
fn test_reducer_collects_simulated_trials() {
    let config = SequentialConfig {
        effect_size: 0.0,
        boundary: BoundaryKind::Naive,
        ..SequentialConfig::default()
    };
    let mut state = reduce(PriadState::new(config), PriadAction::Start { target_trials: 10 });
    let mut rng = rng_from_seed(Some(123));

    for _ in 0..4 {
        let trial = simulate_sequential_test(&state.config, &mut rng).unwrap();
        state = reduce(state, PriadAction::RecordTrial(trial));
    }
    state = reduce(state, PriadAction::Stop);
    assert_eq!(state.status, SimulationStatus::Stopped);
    assert_eq!(state.trials.len(), 4);
    assert!((state.progress() - 0.4).abs() < 1e-12);
    assert_eq!(state.summary().n_simulations, 4);
}

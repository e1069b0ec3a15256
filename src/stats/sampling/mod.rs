// Sampling and random generation module

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::descriptive::{mean, standard_deviation};
use crate::stats::VarianceKind;

/// Mode offset of the bimodal shape, in units of the target SD.
const BIMODAL_OFFSET: f64 = 0.8;
/// Spread of each bimodal mode; 0.8² + 0.6² = 1 keeps the overall SD.
const BIMODAL_MODE_SD: f64 = 0.6;

/// Shape of a simulated population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationShape {
    Normal,
    Uniform,
    /// Shifted exponential, right-skewed
    Skewed,
    /// Equal mixture of two normals
    Bimodal,
}

/// Seeded generator, or a randomly seeded one when `seed` is `None`.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::seed_from_u64(rand::random()),
    }
}

/// Generates `size` values with the given mean and standard deviation.
///
/// Every shape is centred on `mean` with spread `sd`:
/// - `Normal`: N(mean, sd²)
/// - `Uniform`: mean ± √3·sd
/// - `Skewed`: mean - sd + Exp(1/sd)
/// - `Bimodal`: modes at mean ± 0.8·sd, each with SD 0.6·sd
pub fn generate_population<R: Rng + ?Sized>(
    shape: PopulationShape,
    mean: f64,
    sd: f64,
    size: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    if !mean.is_finite() || !sd.is_finite() || sd < 0.0 {
        return Err(Error::InvalidValue(format!(
            "population needs a finite mean and non-negative sd, got mean={}, sd={}",
            mean, sd
        )));
    }
    if sd == 0.0 {
        return Ok(vec![mean; size]);
    }

    let population = match shape {
        PopulationShape::Normal => {
            let normal = Normal::new(mean, sd).map_err(|e| Error::InvalidValue(e.to_string()))?;
            (0..size).map(|_| normal.sample(rng)).collect()
        }
        PopulationShape::Uniform => {
            let half_width = 3.0_f64.sqrt() * sd;
            (0..size)
                .map(|_| rng.random_range(mean - half_width..=mean + half_width))
                .collect()
        }
        PopulationShape::Skewed => {
            let exp = Exp::new(1.0 / sd).map_err(|e| Error::InvalidValue(e.to_string()))?;
            (0..size).map(|_| mean - sd + exp.sample(rng)).collect()
        }
        PopulationShape::Bimodal => {
            let mode = Normal::new(0.0, BIMODAL_MODE_SD * sd)
                .map_err(|e| Error::InvalidValue(e.to_string()))?;
            (0..size)
                .map(|_| {
                    let center = if rng.random::<bool>() {
                        mean + BIMODAL_OFFSET * sd
                    } else {
                        mean - BIMODAL_OFFSET * sd
                    };
                    center + mode.sample(rng)
                })
                .collect()
        }
    };
    Ok(population)
}

/// Draws `n` values without replacement. `n` is clamped to the population size.
pub fn draw_sample<R: Rng + ?Sized>(population: &[f64], n: usize, rng: &mut R) -> Vec<f64> {
    let n = n.min(population.len());
    let mut indices: Vec<usize> = (0..population.len()).collect();
    let (chosen, _) = indices.partial_shuffle(rng, n);
    chosen.iter().map(|&i| population[i]).collect()
}

/// Generates bootstrap resamples, each as long as `data`.
pub fn bootstrap<R: Rng + ?Sized>(data: &[f64], n_samples: usize, rng: &mut R) -> Result<Vec<Vec<f64>>> {
    if data.is_empty() {
        return Err(Error::EmptyData("bootstrap needs data".into()));
    }
    if n_samples == 0 {
        return Err(Error::InvalidValue("number of bootstrap samples must be positive".into()));
    }

    let n = data.len();
    let mut result = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        // Sampling with replacement
        let sample: Vec<f64> = (0..n).map(|_| data[rng.random_range(0..n)]).collect();
        result.push(sample);
    }
    Ok(result)
}

/// Empirical distribution of the sample mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingDistribution {
    pub sample_size: usize,
    pub means: Vec<f64>,
    pub mean_of_means: f64,
    /// SD of the sample means
    pub empirical_standard_error: f64,
    /// σ / √n from the population SD
    pub theoretical_standard_error: f64,
}

/// Draws `replications` samples of size `n` (without replacement) and records their means.
pub fn sampling_distribution_of_mean<R: Rng + ?Sized>(
    population: &[f64],
    n: usize,
    replications: usize,
    rng: &mut R,
) -> Result<SamplingDistribution> {
    if population.is_empty() {
        return Err(Error::EmptyData("sampling distribution needs a population".into()));
    }
    if n == 0 || replications == 0 {
        return Err(Error::InvalidValue(
            "sample size and replications must be positive".into(),
        ));
    }

    let sample_size = n.min(population.len());
    let means: Vec<f64> = (0..replications)
        .map(|_| mean(&draw_sample(population, sample_size, rng)))
        .collect();

    Ok(SamplingDistribution {
        sample_size,
        mean_of_means: mean(&means),
        empirical_standard_error: standard_deviation(&means, VarianceKind::Sample),
        theoretical_standard_error: standard_deviation(population, VarianceKind::Population)
            / (sample_size as f64).sqrt(),
        means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_moments() {
        let mut rng = rng_from_seed(Some(42));
        for shape in [
            PopulationShape::Normal,
            PopulationShape::Uniform,
            PopulationShape::Skewed,
            PopulationShape::Bimodal,
        ] {
            let population = generate_population(shape, 50.0, 10.0, 20_000, &mut rng).unwrap();
            assert_eq!(population.len(), 20_000);
            assert!((mean(&population) - 50.0).abs() < 0.5, "{:?}", shape);
            let sd = standard_deviation(&population, VarianceKind::Sample);
            assert!((sd - 10.0).abs() < 0.5, "{:?}", shape);
        }
    }

    #[test]
    fn test_population_shapes() {
        let mut rng = rng_from_seed(Some(7));
        let uniform = generate_population(PopulationShape::Uniform, 0.0, 1.0, 1000, &mut rng).unwrap();
        let limit = 3.0_f64.sqrt();
        assert!(uniform.iter().all(|&x| x >= -limit && x <= limit));

        // Skewed values never fall below mean - sd
        let skewed = generate_population(PopulationShape::Skewed, 5.0, 2.0, 1000, &mut rng).unwrap();
        assert!(skewed.iter().all(|&x| x >= 3.0));

        let constant = generate_population(PopulationShape::Bimodal, 3.0, 0.0, 4, &mut rng).unwrap();
        assert_eq!(constant, vec![3.0; 4]);

        assert!(generate_population(PopulationShape::Normal, 0.0, -1.0, 10, &mut rng).is_err());
    }

    #[test]
    fn test_seed_reproducibility() {
        let a = generate_population(PopulationShape::Normal, 0.0, 1.0, 10, &mut rng_from_seed(Some(1))).unwrap();
        let b = generate_population(PopulationShape::Normal, 0.0, 1.0, 10, &mut rng_from_seed(Some(1))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_sample_without_replacement() {
        let population: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let mut rng = rng_from_seed(Some(3));
        let mut sample = draw_sample(&population, 30, &mut rng);
        assert_eq!(sample.len(), 30);
        sample.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sample.dedup();
        assert_eq!(sample.len(), 30);

        // n larger than the population is clamped
        assert_eq!(draw_sample(&population[..5], 10, &mut rng).len(), 5);
    }

    #[test]
    fn test_bootstrap() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let mut rng = rng_from_seed(Some(11));

        let bootstrap_samples = bootstrap(&data, 10, &mut rng).unwrap();
        assert_eq!(bootstrap_samples.len(), 10);
        for sample in &bootstrap_samples {
            assert_eq!(sample.len(), data.len());
            assert!(sample.iter().all(|v| data.contains(v)));
        }

        assert!(bootstrap(&[], 10, &mut rng).is_err());
        assert!(bootstrap(&data, 0, &mut rng).is_err());
    }

    #[test]
    fn test_sampling_distribution() {
        let mut rng = rng_from_seed(Some(2024));
        let population = generate_population(PopulationShape::Skewed, 50.0, 10.0, 5000, &mut rng).unwrap();
        let dist = sampling_distribution_of_mean(&population, 25, 2000, &mut rng).unwrap();

        assert_eq!(dist.means.len(), 2000);
        assert!((dist.mean_of_means - mean(&population)).abs() < 0.5);
        // Central limit theorem: SE ≈ σ/√n
        assert!((dist.empirical_standard_error - dist.theoretical_standard_error).abs() < 0.3);
    }
}

//! Analysis settings loaded from TOML, YAML or JSON.
//!
//! Every field has a default, so a file only needs the values it changes.
//! The `simulation` section is optional and only checked when present:
//!
//! ```toml
//! alpha = 0.05
//!
//! [outliers]
//! scope = "across"
//!
//! [outliers.method]
//! method = "z_score"
//! threshold = 2.5
//!
//! [simulation]
//! boundary = "o_brien_fleming"
//! stages = 4
//! seed = 42
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::outliers::{OutlierMethod, OutlierScope};
use crate::stats::sequential::{BoundaryKind, SequentialConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level shared by every test
    pub alpha: f64,
    pub outliers: OutlierConfig,
    pub power: PowerConfig,
    /// Sequential design for PRIAD simulations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            alpha: 0.05,
            outliers: OutlierConfig::default(),
            power: PowerConfig::default(),
            simulation: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub method: OutlierMethod,
    pub scope: OutlierScope,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        OutlierConfig {
            method: OutlierMethod::iqr(),
            scope: OutlierScope::Within,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub effect_size: f64,
    pub target_power: f64,
    /// Upper limit of the per-group sample size search
    pub max_n: usize,
}

impl Default for PowerConfig {
    fn default() -> Self {
        PowerConfig {
            effect_size: 0.5,
            target_power: 0.8,
            max_n: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub effect_size: f64,
    pub n_per_stage: usize,
    pub stages: usize,
    pub boundary: BoundaryKind,
    pub n_simulations: usize,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let sequential = SequentialConfig::default();
        SimulationConfig {
            effect_size: sequential.effect_size,
            n_per_stage: sequential.n_per_stage,
            stages: sequential.stages,
            boundary: sequential.boundary,
            n_simulations: 1000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn to_sequential(&self, alpha: f64) -> SequentialConfig {
        SequentialConfig {
            effect_size: self.effect_size,
            n_per_stage: self.n_per_stage,
            stages: self.stages,
            boundary: self.boundary,
            alpha,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a file, choosing the format from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        log::debug!("loading analysis config from {}", path.display());
        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(Error::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// The sequential design described by the `simulation` section.
    pub fn sequential(&self) -> Option<SequentialConfig> {
        self.simulation
            .as_ref()
            .map(|simulation| simulation.to_sequential(self.alpha))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::Config(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }

        let outlier_param = match self.outliers.method {
            OutlierMethod::Iqr { multiplier } => multiplier,
            OutlierMethod::ZScore { threshold } | OutlierMethod::Mad { threshold } => threshold,
        };
        if !(outlier_param > 0.0) {
            return Err(Error::Config(format!(
                "outlier threshold must be positive, got {}",
                outlier_param
            )));
        }

        if !(self.power.target_power > 0.0 && self.power.target_power < 1.0) {
            return Err(Error::Config(format!(
                "target power must be in (0, 1), got {}",
                self.power.target_power
            )));
        }
        if self.power.max_n < 2 {
            return Err(Error::Config(format!(
                "max_n must be at least 2, got {}",
                self.power.max_n
            )));
        }

        if let Some(simulation) = &self.simulation {
            if simulation.n_simulations == 0 {
                return Err(Error::Config("n_simulations must be positive".into()));
            }
            simulation
                .to_sequential(self.alpha)
                .thresholds()
                .map_err(|e| Error::Config(format!("invalid simulation settings: {}", e)))?;
        }

        Ok(())
    }
}

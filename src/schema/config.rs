//! Run configuration for the command-line driver.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{EvolutionConfig, GraphSource};

/// A complete run: where the graph comes from, how to search, where to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Graph to partition.
    pub graph: GraphSource,
    /// Search parameters.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Output path for the result JSON; stdout when absent.
    #[serde(default)]
    pub output: Option<String>,
}

impl RunConfig {
    /// Read and validate a run configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()
    }

    /// Small grid run used by `--example`.
    pub fn example() -> Self {
        Self {
            graph: GraphSource::Grid {
                rows: 10,
                cols: 10,
                districts: 4,
                weight_keys: vec!["pop".to_string()],
                max_weight: Some(50),
                seed: Some(1),
            },
            evolution: EvolutionConfig {
                generations: 100,
                population_size: 60,
                random_seed: Some(42),
                ..Default::default()
            },
            output: Some("result.json".to_string()),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("No objectives specified")]
    NoObjectives,
    #[error("Mutation probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("Mutation decay {0} is outside (0, 1]")]
    InvalidDecay(f64),
    #[error("Tournament size must be positive")]
    InvalidTournamentSize,
    #[error("Optimization interval must be positive")]
    InvalidInterval,
    #[error("Local search sample size must be positive")]
    InvalidSampleSize,
    #[error("Objective weight key must not be empty")]
    EmptyWeightKey,
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

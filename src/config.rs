//! Training configuration. Loaded from JSON; every field has a default.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{EvoError, Result};
use crate::fitness::FitnessSettings;
use crate::ga::GaParams;
use crate::game::{ACTION_COUNT, OBSERVATION_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Genomes per generation
    pub population_size: usize,
    /// Hidden layer widths between the fixed input and output layers
    pub hidden_layers: Vec<usize>,
    /// Generations to run in headless mode
    pub generations: usize,
    /// Seed for the GA and for every episode; random when absent
    pub seed: Option<u64>,
    /// Worker threads for evaluation; all cores when absent
    pub threads: Option<usize>,
    pub ga: GaParams,
    pub fitness: FitnessSettings,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            hidden_layers: vec![8],
            generations: 100,
            seed: None,
            threads: None,
            ga: GaParams::default(),
            fitness: FitnessSettings::default(),
        }
    }
}

impl TrainingConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// `[inputs, hidden..., outputs]` for the current hidden layers.
    pub fn topology(&self) -> Vec<usize> {
        topology_with_hidden(&self.hidden_layers)
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(EvoError::InvalidPopulationSize);
        }
        if self.hidden_layers.contains(&0) {
            return Err(EvoError::InvalidConfig("hidden layers must not be empty"));
        }
        if self.threads == Some(0) {
            return Err(EvoError::InvalidConfig("threads must be at least 1"));
        }
        let arena = self.fitness.arena;
        if arena.cols < 3 || arena.rows < 2 {
            return Err(EvoError::InvalidConfig("arena must be at least 3x2 cells"));
        }
        if self.fitness.max_steps == 0 {
            return Err(EvoError::InvalidConfig("max_steps must be at least 1"));
        }
        if !self.fitness.food_weight.is_finite() {
            return Err(EvoError::InvalidConfig("food_weight must be finite"));
        }
        self.ga.validate()
    }
}

pub fn topology_with_hidden(hidden: &[usize]) -> Vec<usize> {
    let mut topology = Vec::with_capacity(hidden.len() + 2);
    topology.push(OBSERVATION_SIZE);
    topology.extend_from_slice(hidden);
    topology.push(ACTION_COUNT);
    topology
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topology(), vec![11, 8, 3]);
        assert_eq!(config.fitness.max_steps, 2500);
        assert_eq!(config.fitness.starvation_limit, 150);
        assert_eq!(config.ga.tournament_size, 5);
    }

    #[test]
    fn test_no_hidden_layer() {
        let config = TrainingConfig {
            hidden_layers: Vec::new(),
            ..TrainingConfig::default()
        };
        assert_eq!(config.topology(), vec![11, 3]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "population_size": 32, "seed": 7, "ga": { "mutation_rate": 0.08 } }"#;
        let config: TrainingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.population_size, 32);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.ga.mutation_rate, 0.08);
        assert_eq!(config.ga.tournament_size, 5);
        assert_eq!(config.hidden_layers, vec![8]);
    }

    #[test]
    fn test_json_round_trip() {
        let config = TrainingConfig {
            hidden_layers: vec![12, 6],
            seed: Some(3),
            ..TrainingConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TrainingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_validation_errors() {
        let config = TrainingConfig {
            population_size: 0,
            ..TrainingConfig::default()
        };
        assert_eq!(config.validate(), Err(EvoError::InvalidPopulationSize));

        let config = TrainingConfig {
            hidden_layers: vec![4, 0],
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrainingConfig {
            threads: Some(0),
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrainingConfig::load(Path::new("/nonexistent/snake-evo.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}

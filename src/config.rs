//! Configuration system for gridmind runs.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::neural::DEFAULT_LEARNING_RATE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub brain: BrainConfig,
    pub genetics: GeneticsConfig,
    pub world: WorldConfig,
    pub fitness: FitnessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Grid brain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Columns of the neuron grid
    pub size_x: usize,
    /// Rows of the neuron grid
    pub size_y: usize,
    /// Adapt weights after every tick
    pub learning_enabled: bool,
    /// Rate for neurons without their own override
    pub learning_rate: f32,
}

/// Genetic pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticsConfig {
    /// Genomes per generation
    pub generation_size: usize,
    /// Genes per genome
    pub num_genes: usize,
    /// Per-bit flip probability
    pub mutation_rate: f64,
    /// Genomes copied unchanged into the next generation
    pub elite_size: usize,
    /// Chance that a slot is filled with a fresh random genome
    pub new_gene_probability: f64,
    /// Per-gene chance that a bred child gets a dead neuron
    pub pruning_rate: f64,
    /// Members sampled per tournament
    pub tournament_size: usize,
}

/// World generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    /// Chance that each free cell becomes a wall (0.0 - 1.0)
    pub wall_density: f32,
    pub min_room_size: usize,
    pub max_room_size: usize,
    pub num_rooms: usize,
    /// Diagonal wall segments
    pub num_random_walls: usize,
}

/// Fitness evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessConfig {
    pub num_epochs: usize,
    /// Simulation steps per world
    pub num_moves_per_test: usize,
    /// Worlds each genome is tested in per epoch
    pub num_worlds_to_test: usize,
    /// Penalty for each step the agent stands still
    pub cost_of_not_moving: f32,
    /// Penalty for each move blocked by a wall
    pub error_weight: f32,
    /// Aggregate scores below this count as zero
    pub min_score: f32,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Epochs between checkpoints (0 = never)
    pub checkpoint_interval: usize,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            size_x: 10,
            size_y: 10,
            learning_enabled: true,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            generation_size: 60,
            num_genes: 100,
            mutation_rate: 0.002,
            elite_size: 3,
            new_gene_probability: 0.05,
            pruning_rate: 0.0,
            tournament_size: 3,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            wall_density: 0.05,
            min_room_size: 3,
            max_room_size: 8,
            num_rooms: 3,
            num_random_walls: 4,
        }
    }
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            num_epochs: 50,
            num_moves_per_test: 100,
            num_worlds_to_test: 3,
            cost_of_not_moving: 0.5,
            error_weight: 1.0,
            min_score: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 10,
            log_level: "info".to_string(),
        }
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} must be within [0, 1]", name));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.brain.size_x == 0 || self.brain.size_y == 0 {
            return Err("brain size must be > 0 in both dimensions".to_string());
        }
        if !(0.0..=1.0).contains(&self.brain.learning_rate) {
            return Err("learning_rate must be within [0, 1]".to_string());
        }

        let g = &self.genetics;
        if g.num_genes == 0 {
            return Err("num_genes must be > 0".to_string());
        }
        if g.generation_size == 0 {
            return Err("generation_size must be > 0".to_string());
        }
        if g.elite_size >= g.generation_size {
            return Err("elite_size must be less than generation_size".to_string());
        }
        if g.tournament_size == 0 {
            return Err("tournament_size must be > 0".to_string());
        }
        check_rate("mutation_rate", g.mutation_rate)?;
        check_rate("new_gene_probability", g.new_gene_probability)?;
        check_rate("pruning_rate", g.pruning_rate)?;

        let w = &self.world;
        if w.width == 0 || w.height == 0 {
            return Err("world width and height must be > 0".to_string());
        }
        check_rate("wall_density", w.wall_density as f64)?;
        if w.min_room_size > w.max_room_size {
            return Err("min_room_size cannot exceed max_room_size".to_string());
        }

        let f = &self.fitness;
        if f.num_moves_per_test == 0 || f.num_worlds_to_test == 0 {
            return Err("num_moves_per_test and num_worlds_to_test must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_elite_must_be_smaller() {
        let mut config = Config::default();
        config.genetics.elite_size = config.genetics.generation_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rates_checked() {
        let mut config = Config::default();
        config.genetics.mutation_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.world.wall_density = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_room_sizes_ordered() {
        let mut config = Config::default();
        config.world.min_room_size = 9;
        config.world.max_room_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_logging_section_defaults() {
        let mut value = serde_yaml::to_value(Config::default()).unwrap();
        value.as_mapping_mut().unwrap().remove("logging");
        let loaded: Config = serde_yaml::from_value(value).unwrap();
        assert_eq!(loaded.logging.log_level, "info");
    }
}

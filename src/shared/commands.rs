//! Run settings supplied by a front end before starting training.

use crate::config::Config;
use crate::genetics::GeneticPool;
use serde::{Deserialize, Serialize};

/// Flat set of tunables a front end edits, plus an optional pool to resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub brain_size_x: usize,
    pub brain_size_y: usize,
    pub num_genes: usize,
    pub generation_size: usize,
    pub mutation_rate: f64,
    pub elite_size: usize,
    pub num_epochs: usize,
    pub new_gene_probability: f64,
    pub pruning_rate: f64,
    pub world_width: usize,
    pub world_height: usize,
    pub wall_density: f32,
    pub num_rooms: usize,
    pub num_random_walls: usize,
    pub num_moves_per_test: usize,
    pub num_worlds_to_test: usize,
    pub cost_of_not_moving: f32,
    pub error_weight: f32,
    pub min_score: f32,
    pub learning_enabled: bool,
    /// Continue from this pool instead of a fresh random one
    #[serde(default)]
    pub pool: Option<GeneticPool>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunSettings {
    /// Create settings from a Config
    pub fn from_config(config: &Config) -> Self {
        Self {
            brain_size_x: config.brain.size_x,
            brain_size_y: config.brain.size_y,
            num_genes: config.genetics.num_genes,
            generation_size: config.genetics.generation_size,
            mutation_rate: config.genetics.mutation_rate,
            elite_size: config.genetics.elite_size,
            num_epochs: config.fitness.num_epochs,
            new_gene_probability: config.genetics.new_gene_probability,
            pruning_rate: config.genetics.pruning_rate,
            world_width: config.world.width,
            world_height: config.world.height,
            wall_density: config.world.wall_density,
            num_rooms: config.world.num_rooms,
            num_random_walls: config.world.num_random_walls,
            num_moves_per_test: config.fitness.num_moves_per_test,
            num_worlds_to_test: config.fitness.num_worlds_to_test,
            cost_of_not_moving: config.fitness.cost_of_not_moving,
            error_weight: config.fitness.error_weight,
            min_score: config.fitness.min_score,
            learning_enabled: config.brain.learning_enabled,
            pool: None,
        }
    }

    /// Apply settings to a Config
    pub fn apply_to_config(&self, config: &mut Config) {
        config.brain.size_x = self.brain_size_x;
        config.brain.size_y = self.brain_size_y;
        config.brain.learning_enabled = self.learning_enabled;
        config.genetics.num_genes = self.num_genes;
        config.genetics.generation_size = self.generation_size;
        config.genetics.mutation_rate = self.mutation_rate;
        config.genetics.elite_size = self.elite_size;
        config.genetics.new_gene_probability = self.new_gene_probability;
        config.genetics.pruning_rate = self.pruning_rate;
        config.world.width = self.world_width;
        config.world.height = self.world_height;
        config.world.wall_density = self.wall_density;
        config.world.num_rooms = self.num_rooms;
        config.world.num_random_walls = self.num_random_walls;
        config.fitness.num_epochs = self.num_epochs;
        config.fitness.num_moves_per_test = self.num_moves_per_test;
        config.fitness.num_worlds_to_test = self.num_worlds_to_test;
        config.fitness.cost_of_not_moving = self.cost_of_not_moving;
        config.fitness.error_weight = self.error_weight;
        config.fitness.min_score = self.min_score;
    }

    /// Default config with these settings applied
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        self.apply_to_config(&mut config);
        config
    }
}

/// Lifecycle of a background training run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Finished,
    Cancelled,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip_through_config() {
        let mut settings = RunSettings::default();
        settings.brain_size_x = 7;
        settings.wall_density = 0.2;
        settings.num_worlds_to_test = 5;

        let config = settings.to_config();
        assert_eq!(config.brain.size_x, 7);
        assert_eq!(config.world.wall_density, 0.2);

        assert_eq!(RunSettings::from_config(&config), settings);
    }

    #[test]
    fn test_unrelated_config_kept() {
        let mut config = Config::default();
        config.logging.checkpoint_interval = 42;
        RunSettings::default().apply_to_config(&mut config);
        assert_eq!(config.logging.checkpoint_interval, 42);
    }
}

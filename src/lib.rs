//! # GRIDMIND
//!
//! Evolves cellular grid brains that steer agents through walled worlds.
//!
//! ## Features
//!
//! - **Bit-packed genomes**: every 64-bit gene decodes to a neuron
//! - **Grid brains**: toroidal neuron grids with a two-phase tick
//! - **Parallel**: fitness evaluation spread over all cores via Rayon
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random streams per epoch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridmind::{Config, EvolutionEngine};
//!
//! let config = Config::default();
//! let mut engine = EvolutionEngine::new(config, 42).unwrap();
//!
//! engine.run(10).unwrap();
//!
//! println!("Best fitness: {}", engine.best_fitness());
//! ```
//!
//! ## Background training
//!
//! ```rust,no_run
//! use gridmind::shared::{RunSettings, TrainingHandle};
//!
//! let mut handle = TrainingHandle::setup(RunSettings::default(), 7).unwrap();
//! if let Some(snapshot) = handle.try_recv_snapshot() {
//!     println!("{} (epoch {})", snapshot.phase_label(), snapshot.epoch);
//! }
//! handle.cancel();
//! let engine = handle.join().unwrap();
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use gridmind::{Config, EvolutionEngine};
//! use gridmind::checkpoint::Checkpoint;
//!
//! let mut engine = EvolutionEngine::new(Config::default(), 1).unwrap();
//! engine.run(5).unwrap();
//!
//! engine.create_checkpoint().save("checkpoint.bin").unwrap();
//!
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let restored = EvolutionEngine::from_checkpoint(loaded).unwrap();
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evolution;
pub mod genetics;
pub mod grid;
pub mod neural;
pub mod organism;
pub mod shared;
pub mod stats;
pub mod world;

// Re-export main types
pub use config::Config;
pub use error::EvoError;
pub use evolution::{evaluate_genome, BestGenome, EpochOutcome, EvolutionEngine};
pub use genetics::GeneticPool;
pub use grid::{Direction, WallGrid};
pub use neural::{decode_gene, Genome, GridNetwork, Neuron, NeuronKind};
pub use organism::Agent;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark: `epochs` epochs over a pool of `population`
pub fn benchmark(epochs: usize, population: usize) -> Result<BenchmarkResult, EvoError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.genetics.generation_size = population.max(2);
    config.genetics.elite_size = config.genetics.elite_size.min(population.max(2) - 1);
    config.fitness.num_epochs = epochs;

    let mut engine = EvolutionEngine::new(config, 0)?;

    let start = Instant::now();
    let completed = engine.run(epochs)?;
    let elapsed = start.elapsed().as_secs_f64();

    let moves = engine.config().fitness.num_moves_per_test * engine.config().fitness.num_worlds_to_test;
    let agent_steps = (completed * engine.pool().len() * moves) as f64;

    Ok(BenchmarkResult {
        epochs: completed,
        population: engine.pool().len(),
        elapsed_secs: elapsed,
        epochs_per_second: completed as f64 / elapsed.max(f64::EPSILON),
        agent_steps_per_second: agent_steps / elapsed.max(f64::EPSILON),
        best_fitness: engine.best_fitness(),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub epochs: usize,
    pub population: usize,
    pub elapsed_secs: f64,
    pub epochs_per_second: f64,
    pub agent_steps_per_second: f64,
    pub best_fitness: f32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Epochs: {}", self.epochs)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.2} epochs/s", self.epochs_per_second)?;
        writeln!(f, "Agent steps: {:.0}/s", self.agent_steps_per_second)?;
        writeln!(f, "Best fitness: {:.2}", self.best_fitness)?;
        Ok(())
    }
}

//! Fitness driver: evaluates the pool in sampled worlds and breeds the next
//! generation.
//!
//! Every epoch draws its worlds and start cells up front from a random
//! stream derived from `(seed, epoch)`, scores all genomes in parallel, and
//! only then touches the pool. A cancelled epoch leaves the pool exactly as
//! it was.

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::error::EvoError;
use crate::genetics::GeneticPool;
use crate::grid::WallGrid;
use crate::neural::{Genome, GridNetwork};
use crate::shared::Phase;
use crate::stats::{EpochStats, StatsHistory};
use crate::world::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// World generation attempts before giving up on a fully walled layout
const WORLD_ATTEMPTS: usize = 10;

/// A generated world and the cell agents start from
#[derive(Clone, Debug)]
pub struct WorldTemplate {
    pub walls: WallGrid,
    pub start: (i32, i32),
}

/// Best genome seen during a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestGenome {
    pub genome: Genome,
    pub fitness: f32,
    pub epoch: usize,
}

/// What an epoch ended with
#[derive(Clone, Debug, PartialEq)]
pub enum EpochOutcome {
    /// Scores recorded and the pool evolved
    Evolved(EpochStats),
    /// Nothing scored above zero, the pool was regenerated
    Reinitialized(EpochStats),
    /// Stopped before all genomes were scored; the pool is unchanged
    Cancelled,
}

impl EpochOutcome {
    pub fn stats(&self) -> Option<&EpochStats> {
        match self {
            EpochOutcome::Evolved(stats) | EpochOutcome::Reinitialized(stats) => Some(stats),
            EpochOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EpochOutcome::Cancelled)
    }
}

/// Fitness of one genome: mean over `worlds` of its navigation score.
///
/// A run scores `distinct cells visited - cost_of_not_moving * idle steps -
/// error_weight * blocked moves`. Means below `min_score`, negative or
/// non-finite count as zero.
pub fn evaluate_genome(
    genome: &Genome,
    config: &Config,
    worlds: &[WorldTemplate],
) -> Result<f32, EvoError> {
    if worlds.is_empty() {
        return Ok(0.0);
    }
    let learning = config
        .brain
        .learning_enabled
        .then_some(config.brain.learning_rate);

    let mut total = 0.0f32;
    for template in worlds {
        let brain = GridNetwork::from_genome(config.brain.size_y, config.brain.size_x, genome)?;
        let mut world = World::new(template.walls.clone()).with_learning(learning);
        let (x, y) = template.start;
        let index = world.place_agent(brain, x, y)?;
        world.run(config.fitness.num_moves_per_test)?;
        if let Some(agent) = world.agent(index) {
            total += agent.score(&config.fitness);
        }
    }

    let mean = total / worlds.len() as f32;
    if !mean.is_finite() || mean < 0.0 || mean < config.fitness.min_score {
        return Ok(0.0);
    }
    Ok(mean)
}

/// Drives epochs over a genetic pool
pub struct EvolutionEngine {
    config: Config,
    pool: GeneticPool,
    seed: u64,
    epoch: usize,
    best: Option<BestGenome>,
    history: StatsHistory,
    /// Worlds of the most recent epoch, kept for display
    last_worlds: Vec<WorldTemplate>,
    cancel: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Engine with a fresh random pool
    pub fn new(config: Config, seed: u64) -> Result<Self, EvoError> {
        config.validate().map_err(EvoError::InvalidArgument)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pool = GeneticPool::from_config(&config.genetics, &mut rng)?;
        Ok(Self::assemble(config, pool, seed))
    }

    /// Continue from an existing pool; the config's genetic rates apply to it
    pub fn with_pool(config: Config, pool: GeneticPool, seed: u64) -> Result<Self, EvoError> {
        config.validate().map_err(EvoError::InvalidArgument)?;
        if pool.is_empty() {
            return Err(EvoError::EmptyResource("pool to resume from is empty".to_string()));
        }
        let pool = pool
            .with_mutation_rate(config.genetics.mutation_rate)?
            .with_pruning_rate(config.genetics.pruning_rate)?
            .with_tournament_size(config.genetics.tournament_size);
        Ok(Self::assemble(config, pool, seed))
    }

    fn assemble(config: Config, pool: GeneticPool, seed: u64) -> Self {
        Self {
            config,
            pool,
            seed,
            epoch: 0,
            best: None,
            history: StatsHistory::new(),
            last_worlds: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restore a run saved with [`create_checkpoint`](Self::create_checkpoint)
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, EvoError> {
        let mut engine = Self::with_pool(checkpoint.config, checkpoint.pool, checkpoint.seed)?;
        engine.epoch = checkpoint.epoch;
        engine.best = checkpoint.best;
        engine.history = checkpoint.history;
        Ok(engine)
    }

    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.epoch,
            self.config.clone(),
            self.pool.clone(),
            self.best.clone(),
            self.history.clone(),
            self.seed,
        )
    }

    /// Flag that stops the run at the next genome or epoch boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Share a cancellation flag owned by someone else
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = flag;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Random stream for the current epoch; stream 0 seeded the initial pool
    fn epoch_rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(self.epoch as u64 + 1);
        rng
    }

    /// Generate this epoch's worlds and start cells
    pub fn sample_worlds(&self, rng: &mut ChaCha8Rng) -> Result<Vec<WorldTemplate>, EvoError> {
        (0..self.config.fitness.num_worlds_to_test)
            .map(|_| {
                let mut last_err = None;
                for _ in 0..WORLD_ATTEMPTS {
                    let walls = WallGrid::random(&self.config.world, rng);
                    match walls.random_empty_cell(rng) {
                        Ok(start) => return Ok(WorldTemplate { walls, start }),
                        Err(e) => last_err = Some(e),
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    EvoError::EmptyResource("no world with a free cell".to_string())
                }))
            })
            .collect()
    }

    /// Score every genome in parallel. `None` marks a genome skipped after
    /// cancellation.
    pub fn evaluate_pool(&self, worlds: &[WorldTemplate]) -> Result<Vec<Option<f32>>, EvoError> {
        self.evaluate_pool_with(worlds, &|_| {})
    }

    /// `after_genome` runs with each genome's index once it has been scored
    fn evaluate_pool_with<G>(
        &self,
        worlds: &[WorldTemplate],
        after_genome: &G,
    ) -> Result<Vec<Option<f32>>, EvoError>
    where
        G: Fn(usize) + Sync,
    {
        let cancel = &self.cancel;
        let config = &self.config;
        self.pool
            .genomes()
            .par_iter()
            .enumerate()
            .map(|(index, genome)| {
                if cancel.load(Ordering::Relaxed) {
                    return Ok(None);
                }
                let score = evaluate_genome(genome, config, worlds)?;
                after_genome(index);
                Ok(Some(score))
            })
            .collect()
    }

    /// Run one epoch
    pub fn run_epoch(&mut self) -> Result<EpochOutcome, EvoError> {
        self.run_epoch_observed(|_| {})
    }

    /// Run one epoch, reporting each phase as it starts
    pub fn run_epoch_observed<F>(&mut self, on_phase: F) -> Result<EpochOutcome, EvoError>
    where
        F: FnMut(Phase),
    {
        self.run_epoch_with(on_phase, &|_| {})
    }

    fn run_epoch_with<F, G>(
        &mut self,
        mut on_phase: F,
        after_genome: &G,
    ) -> Result<EpochOutcome, EvoError>
    where
        F: FnMut(Phase),
        G: Fn(usize) + Sync,
    {
        if self.is_cancelled() {
            return Ok(EpochOutcome::Cancelled);
        }
        let mut rng = self.epoch_rng();

        on_phase(Phase::GeneratingWorlds);
        log::debug!("Epoch {}: generating worlds", self.epoch);
        let worlds = self.sample_worlds(&mut rng)?;

        on_phase(Phase::Evaluating);
        log::debug!("Epoch {}: evaluating {} genomes", self.epoch, self.pool.len());
        let started = Instant::now();
        let scores = self.evaluate_pool_with(&worlds, after_genome)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        // Barrier: nothing reaches the pool unless every genome was scored
        let Some(scores) = scores.into_iter().collect::<Option<Vec<f32>>>() else {
            log::info!("Epoch {} cancelled, pool left at generation {}", self.epoch, self.pool.generation());
            return Ok(EpochOutcome::Cancelled);
        };
        for (i, &score) in scores.iter().enumerate() {
            self.pool.set_fitness(i, score)?;
        }
        self.last_worlds = worlds;

        let mut stats = EpochStats::from_scores(self.epoch, self.pool.generation(), &scores);
        stats.elapsed_ms = elapsed_ms;
        self.track_best();

        let genetics = &self.config.genetics;
        let outcome = if stats.best <= 0.0 {
            on_phase(Phase::Reinitializing);
            log::warn!("Epoch {}: no genome scored, reinitializing pool", self.epoch);
            self.pool.reinitialize(genetics.generation_size, &mut rng);
            stats.reinitialized = true;
            EpochOutcome::Reinitialized(stats.clone())
        } else {
            on_phase(Phase::Evolving);
            self.pool.evolve(
                genetics.generation_size,
                genetics.elite_size,
                genetics.new_gene_probability,
                &mut rng,
            )?;
            EpochOutcome::Evolved(stats.clone())
        };

        log::info!("{}", stats.summary());
        self.history.record(stats);
        self.epoch += 1;
        Ok(outcome)
    }

    fn track_best(&mut self) {
        let Some((index, fitness)) = self.pool.best() else {
            return;
        };
        // a zero epoch is about to be reinitialized; nothing worth keeping
        if fitness <= 0.0 {
            return;
        }
        let improved = self.best.as_ref().map_or(true, |b| fitness > b.fitness);
        if improved {
            if let Ok(genome) = self.pool.genome(index) {
                self.best = Some(BestGenome {
                    genome: genome.clone(),
                    fitness,
                    epoch: self.epoch,
                });
            }
        }
    }

    /// Run up to `epochs` epochs; returns how many completed
    pub fn run(&mut self, epochs: usize) -> Result<usize, EvoError> {
        self.run_with_callback(epochs, |_, _| {})
    }

    /// Run with callback after each epoch. Stops early on cancellation.
    pub fn run_with_callback<F>(&mut self, epochs: usize, mut callback: F) -> Result<usize, EvoError>
    where
        F: FnMut(&EvolutionEngine, &EpochOutcome),
    {
        let mut completed = 0;
        for _ in 0..epochs {
            let outcome = self.run_epoch()?;
            callback(self, &outcome);
            if outcome.is_cancelled() {
                break;
            }
            completed += 1;
        }
        Ok(completed)
    }

    /// Epochs left until `fitness.num_epochs` is reached
    pub fn remaining_epochs(&self) -> usize {
        self.config.fitness.num_epochs.saturating_sub(self.epoch)
    }

    /// Network of the best genome found so far
    pub fn best_network(&self) -> Option<Result<GridNetwork, EvoError>> {
        self.best.as_ref().map(|best| {
            GridNetwork::from_genome(self.config.brain.size_y, self.config.brain.size_x, &best.genome)
        })
    }

    /// The best genome placed in the latest epoch's first world, ready to step
    pub fn showcase(&self) -> Option<Result<World, EvoError>> {
        let template = self.last_worlds.first()?;
        let network = self.best_network()?;
        let learning = self
            .config
            .brain
            .learning_enabled
            .then_some(self.config.brain.learning_rate);
        Some(network.and_then(|brain| {
            let mut world = World::new(template.walls.clone()).with_learning(learning);
            let (x, y) = template.start;
            world.place_agent(brain, x, y)?;
            Ok(world)
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &GeneticPool {
        &self.pool
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn best(&self) -> Option<&BestGenome> {
        self.best.as_ref()
    }

    pub fn best_fitness(&self) -> f32 {
        self.best.as_ref().map_or(0.0, |b| b.fitness)
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.brain.size_x = 4;
        config.brain.size_y = 4;
        config.genetics.num_genes = 16;
        config.genetics.generation_size = 12;
        config.genetics.elite_size = 2;
        config.world.width = 12;
        config.world.height = 12;
        config.fitness.num_moves_per_test = 20;
        config.fitness.num_worlds_to_test = 2;
        config
    }

    #[test]
    fn test_engine_creation() {
        let engine = EvolutionEngine::new(test_config(), 1).unwrap();
        assert_eq!(engine.pool().len(), 12);
        assert_eq!(engine.epoch(), 0);
        assert!(engine.best().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.genetics.elite_size = 12;
        assert!(matches!(
            EvolutionEngine::new(config, 1),
            Err(EvoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_epoch_resets_scores() {
        let mut engine = EvolutionEngine::new(test_config(), 5).unwrap();
        let outcome = engine.run_epoch().unwrap();

        assert!(!outcome.is_cancelled());
        assert_eq!(engine.epoch(), 1);
        assert_eq!(engine.pool().len(), 12);
        assert!(engine.pool().fitness_scores().iter().all(|&f| f == 0.0));
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_zero_epoch_reinitializes() {
        let mut config = test_config();
        // unreachable threshold: everything scores zero
        config.fitness.min_score = 1.0e6;
        let mut engine = EvolutionEngine::new(config, 9).unwrap();
        let before = engine.pool().genomes().to_vec();

        let outcome = engine.run_epoch().unwrap();
        assert!(matches!(outcome, EpochOutcome::Reinitialized(_)));
        assert_eq!(engine.pool().generation(), 0);
        assert_ne!(engine.pool().genomes(), &before[..]);
    }

    #[test]
    fn test_cancelled_epoch_leaves_pool() {
        let mut engine = EvolutionEngine::new(test_config(), 3).unwrap();
        let before = engine.pool().clone();
        engine.cancel_flag().store(true, Ordering::Relaxed);

        let outcome = engine.run_epoch().unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(engine.pool(), &before);
        assert_eq!(engine.epoch(), 0);
        assert_eq!(engine.run(5).unwrap(), 0);
    }

    #[test]
    fn test_cancel_mid_evaluation_discards_scores() {
        let mut engine = EvolutionEngine::new(test_config(), 3).unwrap();
        let before = engine.pool().clone();
        let cancel = engine.cancel_flag();
        let scored = std::sync::atomic::AtomicUsize::new(0);

        // one worker: the first genome is scored, every later one sees the flag
        let workers = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let outcome = workers
            .install(|| {
                engine.run_epoch_with(|_| {}, &|_| {
                    scored.fetch_add(1, Ordering::Relaxed);
                    cancel.store(true, Ordering::Relaxed);
                })
            })
            .unwrap();

        assert_eq!(scored.load(Ordering::Relaxed), 1);
        assert_eq!(outcome, EpochOutcome::Cancelled);
        assert_eq!(engine.pool(), &before);
        assert_eq!(engine.pool().fitness_scores(), before.fitness_scores());
        assert!(engine.history().is_empty());
        assert!(engine.best().is_none());
        assert_eq!(engine.epoch(), 0);
    }

    #[test]
    fn test_zero_epoch_records_no_best() {
        let mut config = test_config();
        config.fitness.min_score = 1.0e6;
        let mut engine = EvolutionEngine::new(config, 9).unwrap();

        engine.run(2).unwrap();
        assert!(engine.best().is_none());
        assert!(engine.best_network().is_none());
        assert_eq!(engine.best_fitness(), 0.0);
    }

    #[test]
    fn test_seeded_runs_match() {
        let run = || {
            let mut engine = EvolutionEngine::new(test_config(), 77).unwrap();
            engine.run(3).unwrap();
            (engine.pool().clone(), engine.history().best_series())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_evaluate_genome_bounds() {
        let config = test_config();
        let engine = EvolutionEngine::new(config.clone(), 11).unwrap();
        let mut rng = engine.epoch_rng();
        let worlds = engine.sample_worlds(&mut rng).unwrap();
        assert_eq!(worlds.len(), 2);

        for genome in engine.pool().genomes() {
            let score = evaluate_genome(genome, &config, &worlds).unwrap();
            assert!(score >= 0.0);
            // cannot visit more cells than the world has
            assert!(score <= (config.world.width * config.world.height) as f32);
        }
        assert_eq!(evaluate_genome(&engine.pool().genomes()[0], &config, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_checkpoint_resume_matches() {
        let config = test_config();
        let mut straight = EvolutionEngine::new(config.clone(), 21).unwrap();
        straight.run(2).unwrap();

        let mut first = EvolutionEngine::new(config, 21).unwrap();
        first.run(1).unwrap();
        let mut resumed = EvolutionEngine::from_checkpoint(first.create_checkpoint()).unwrap();
        resumed.run(1).unwrap();

        assert_eq!(resumed.epoch(), 2);
        assert_eq!(resumed.pool(), straight.pool());
    }

    #[test]
    fn test_callback_per_epoch() {
        let mut engine = EvolutionEngine::new(test_config(), 4).unwrap();
        let mut seen = Vec::new();
        let done = engine
            .run_with_callback(3, |e, outcome| seen.push((e.epoch(), outcome.stats().is_some())))
            .unwrap();
        assert_eq!(done, 3);
        assert_eq!(seen, vec![(1, true), (2, true), (3, true)]);
    }
}

//! Genetic pool: a population of genomes with one fitness score each.

use super::crossover::{mutate_bits, prune, single_point};
use crate::config::GeneticsConfig;
use crate::error::EvoError;
use crate::neural::{Genome, GenomeProvider};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Share of the population `random_provider` samples from
const TOP_FRACTION: f32 = 0.1;

/// NaN scores never win a comparison
#[inline]
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Rates are probabilities; anything non-finite or outside [0, 1] is a caller error
fn check_rate(name: &str, rate: f64) -> Result<f64, EvoError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(EvoError::invalid(format!("{} {} outside [0, 1]", name, rate)))
    }
}

/// Population of genomes plus a parallel list of fitness scores
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticPool {
    genomes: Vec<Genome>,
    fitness: Vec<f32>,
    genome_len: usize,
    mutation_rate: f64,
    pruning_rate: f64,
    tournament_size: usize,
    /// Completed `evolve` calls
    generation: u64,
}

impl GeneticPool {
    /// Pool of `size` random genomes with `genome_len` genes each
    pub fn new<R: Rng + ?Sized>(size: usize, genome_len: usize, rng: &mut R) -> Self {
        let defaults = GeneticsConfig::default();
        let mut pool = Self {
            genomes: Vec::new(),
            fitness: Vec::new(),
            genome_len,
            mutation_rate: defaults.mutation_rate,
            pruning_rate: defaults.pruning_rate,
            tournament_size: defaults.tournament_size,
            generation: 0,
        };
        pool.reinitialize(size, rng);
        pool
    }

    /// Pool sized and tuned from the genetics config section
    pub fn from_config<R: Rng + ?Sized>(
        config: &GeneticsConfig,
        rng: &mut R,
    ) -> Result<Self, EvoError> {
        Ok(Self::new(config.generation_size, config.num_genes, rng)
            .with_mutation_rate(config.mutation_rate)?
            .with_pruning_rate(config.pruning_rate)?
            .with_tournament_size(config.tournament_size))
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Result<Self, EvoError> {
        self.mutation_rate = check_rate("mutation rate", rate)?;
        Ok(self)
    }

    pub fn with_pruning_rate(mut self, rate: f64) -> Result<Self, EvoError> {
        self.pruning_rate = check_rate("pruning rate", rate)?;
        Ok(self)
    }

    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size.max(1);
        self
    }

    /// Discard every genome and start over with `size` random ones
    pub fn reinitialize<R: Rng + ?Sized>(&mut self, size: usize, rng: &mut R) {
        self.genomes = (0..size).map(|_| self.generate_genome(rng)).collect();
        self.fitness = vec![0.0; size];
    }

    /// Genome of independently drawn random genes
    pub fn generate_genome<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        Genome::random(self.genome_len, rng)
    }

    /// Single-point crossover of members `i` and `j`; the point is drawn
    /// uniformly over the genome length.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        i: usize,
        j: usize,
        rng: &mut R,
    ) -> Result<Genome, EvoError> {
        let first = self.genome(i)?;
        let second = self.genome(j)?;
        let point = if first.is_empty() {
            0
        } else {
            rng.gen_range(0..first.len())
        };
        single_point(first, second, point)
    }

    /// Per-bit mutation at the pool's mutation rate
    pub fn mutate_genome<R: Rng + ?Sized>(&self, genome: &mut Genome, rng: &mut R) {
        mutate_bits(genome, self.mutation_rate, rng);
    }

    /// Lesion genes at the pool's pruning rate
    pub fn prune<R: Rng + ?Sized>(&self, genome: &mut Genome, rng: &mut R) -> usize {
        prune(genome, self.pruning_rate, rng)
    }

    /// Record a score. Negative scores are rejected; NaN marks the genome
    /// as excluded from elite selection.
    pub fn set_fitness(&mut self, index: usize, score: f32) -> Result<(), EvoError> {
        if score < 0.0 {
            return Err(EvoError::invalid(format!(
                "fitness must be non-negative, got {}",
                score
            )));
        }
        let len = self.fitness.len();
        let slot = self
            .fitness
            .get_mut(index)
            .ok_or_else(|| EvoError::invalid(format!("index {} outside pool of {}", index, len)))?;
        *slot = score;
        Ok(())
    }

    pub fn fitness(&self, index: usize) -> Result<f32, EvoError> {
        self.fitness
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn genome(&self, index: usize) -> Result<&Genome, EvoError> {
        self.genomes.get(index).ok_or_else(|| self.out_of_range(index))
    }

    fn out_of_range(&self, index: usize) -> EvoError {
        EvoError::invalid(format!(
            "index {} outside pool of {}",
            index,
            self.genomes.len()
        ))
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn fitness_scores(&self) -> &[f32] {
        &self.fitness
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn genome_len(&self) -> usize {
        self.genome_len
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn pruning_rate(&self) -> f64 {
        self.pruning_rate
    }

    /// Index and score of the fittest member, NaN scores skipped
    pub fn best(&self) -> Option<(usize, f32)> {
        self.fitness
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, f)| !f.is_nan())
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    }

    /// Indices sorted by fitness, best first; ties keep list order
    fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.fitness.len()).collect();
        order.sort_by(|&a, &b| {
            rank_key(self.fitness[b])
                .partial_cmp(&rank_key(self.fitness[a]))
                .unwrap_or(Ordering::Equal)
        });
        order
    }

    /// The `count` fittest members, never ones scored NaN
    pub fn elite_indices(&self, count: usize) -> Vec<usize> {
        self.ranked()
            .into_iter()
            .filter(|&i| !self.fitness[i].is_nan())
            .take(count)
            .collect()
    }

    /// Fittest of a random sample of `tournament_size` members
    pub fn tournament<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let indices: Vec<usize> = (0..self.genomes.len()).collect();
        indices
            .choose_multiple(rng, self.tournament_size.min(indices.len()))
            .copied()
            .max_by(|&a, &b| {
                rank_key(self.fitness[a])
                    .partial_cmp(&rank_key(self.fitness[b]))
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// Replace the population with the next generation.
    ///
    /// Elites are copied first, then slots are filled with fresh genomes
    /// (probability `new_gene_probability`) or mutated tournament offspring.
    /// All scores reset to zero.
    pub fn evolve<R: Rng + ?Sized>(
        &mut self,
        generation_size: usize,
        elite_size: usize,
        new_gene_probability: f64,
        rng: &mut R,
    ) -> Result<(), EvoError> {
        if elite_size >= generation_size {
            return Err(EvoError::invalid(format!(
                "elite size {} must be less than generation size {}",
                elite_size, generation_size
            )));
        }
        let new_gene_probability = check_rate("new gene probability", new_gene_probability)?;

        let mut next: Vec<Genome> = Vec::with_capacity(generation_size);
        for i in self.elite_indices(elite_size) {
            next.push(self.genomes[i].clone());
        }

        while next.len() < generation_size {
            let parents = if rng.gen_bool(new_gene_probability) {
                None
            } else {
                self.tournament(rng).zip(self.tournament(rng))
            };
            let child = match parents {
                Some((a, b)) => {
                    let mut child = self.crossover(a, b, rng)?;
                    self.mutate_genome(&mut child, rng);
                    self.prune(&mut child, rng);
                    child
                }
                None => self.generate_genome(rng),
            };
            next.push(child);
        }

        self.genomes = next;
        self.fitness = vec![0.0; generation_size];
        self.generation += 1;
        Ok(())
    }

    /// A genome drawn uniformly from the top 10% by fitness
    pub fn random_top_genome<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Genome> {
        let top = ((self.len() as f32 * TOP_FRACTION).ceil() as usize).max(1);
        let ranked = self.ranked();
        ranked
            .get(..top.min(ranked.len()))?
            .choose(rng)
            .map(|&i| &self.genomes[i])
    }

    /// Neuron provider over a genome from the top 10%
    pub fn random_provider<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<GenomeProvider<'_>> {
        self.random_top_genome(rng).map(Genome::provider)
    }
}

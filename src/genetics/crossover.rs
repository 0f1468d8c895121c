//! Genome operators: single-point crossover, bit mutation and pruning.

use crate::error::EvoError;
use crate::neural::gene::with_kind;
use crate::neural::{Genome, NeuronKind};
use rand::Rng;

/// Clamp a probability into [0, 1]; NaN counts as never
#[inline]
pub(crate) fn unit_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Child with genes `[0, point)` from `first` and `[point, len)` from `second`.
///
/// Both parents must have the same length and `point <= len`.
pub fn single_point(first: &Genome, second: &Genome, point: usize) -> Result<Genome, EvoError> {
    if first.len() != second.len() {
        return Err(EvoError::invalid(format!(
            "parents differ in length ({} vs {})",
            first.len(),
            second.len()
        )));
    }
    if point > first.len() {
        return Err(EvoError::invalid(format!(
            "crossover point {} beyond genome length {}",
            point,
            first.len()
        )));
    }

    let mut genes = Vec::with_capacity(first.len());
    genes.extend_from_slice(&first.genes()[..point]);
    genes.extend_from_slice(&second.genes()[point..]);
    Ok(Genome::new(genes))
}

/// Flip every bit of every gene independently with probability `rate`.
pub fn mutate_bits<R: Rng + ?Sized>(genome: &mut Genome, rate: f64, rng: &mut R) {
    let rate = unit_rate(rate);
    if rate == 0.0 {
        return;
    }
    for gene in genome.genes_mut() {
        let mut mask = 0u64;
        for bit in 0..64 {
            if rng.gen_bool(rate) {
                mask |= 1 << bit;
            }
        }
        *gene ^= mask;
    }
}

/// Turn genes into dead neurons with probability `rate` each.
///
/// Returns how many genes were lesioned.
pub fn prune<R: Rng + ?Sized>(genome: &mut Genome, rate: f64, rng: &mut R) -> usize {
    let rate = unit_rate(rate);
    if rate == 0.0 {
        return 0;
    }
    let mut pruned = 0;
    for gene in genome.genes_mut() {
        if rng.gen_bool(rate) {
            *gene = with_kind(*gene, NeuronKind::Dead);
            pruned += 1;
        }
    }
    pruned
}

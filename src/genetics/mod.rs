//! Genetics module - genome operators and the genetic pool.

pub mod crossover;
pub mod pool;

pub use crossover::{mutate_bits, prune, single_point};
pub use pool::GeneticPool;

//! Cellular grid brains.
//!
//! - Bit-packed genes decoded into neuron parameters
//! - Eleven neuron variants with their own fire/commit rules
//! - A toroidal grid network ticked in two phases
//! - Per-neuron lifetime weight adaptation

pub mod gene;
mod learning;
mod network;
mod neuron;

pub use gene::{decode_gene, Gene, Genome, GenomeProvider, NeuronKind, NeuronSpec, WeightStrategy};
pub use learning::{DEFAULT_LEARNING_RATE, WEIGHT_LIMIT};
pub use network::{GridNetwork, NeuronProvider, UniformProvider};
pub use neuron::{CellPos, Channel, Connection, Neuron, NeuronVariant};

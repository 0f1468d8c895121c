//! Bit-packed genes and the genomes built from them.
//!
//! Gene layout (bit 0 = least significant):
//!
//! | Bits  | Field                                              |
//! |-------|----------------------------------------------------|
//! | 0-3   | weight-update strategy (1 = strength based)         |
//! | 4-7   | neuron variant, taken modulo the variant count      |
//! | 8-10  | relay direction                                     |
//! | 11-18 | action ID (motor)                                   |
//! | 19-26 | sensor ID (sensory)                                 |
//! | 27-35 | blink/sine period - 2, also the threshold level     |
//! | 34-43 | learning rate, value / 1024                         |
//! | 44-51 | sigmoid exponent, mapped onto [7, 13]               |
//! | 52-59 | sigmoid numerator, mapped onto [-5, 5]              |
//! | 60-63 | initial outgoing weight, mapped onto [-1, 1]        |
//!
//! Fields overlap on purpose; each variant reads only the fields it uses.

use crate::grid::Direction;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type Gene = u64;

const STRATEGY_SHIFT: u32 = 0;
const STRATEGY_MASK: u64 = 0xF;
pub const VARIANT_SHIFT: u32 = 4;
pub const VARIANT_MASK: u64 = 0xF;
const RELAY_SHIFT: u32 = 8;
const RELAY_MASK: u64 = 0x7;
const ACTION_SHIFT: u32 = 11;
const SENSOR_SHIFT: u32 = 19;
const BYTE_MASK: u64 = 0xFF;
const PERIOD_SHIFT: u32 = 27;
const PERIOD_MASK: u64 = 0x1FF;
const LEARNING_SHIFT: u32 = 34;
const LEARNING_MASK: u64 = 0x3FF;
const EXPONENT_SHIFT: u32 = 44;
const NUMERATOR_SHIFT: u32 = 52;
const WEIGHT_SHIFT: u32 = 60;
const WEIGHT_MASK: u64 = 0xF;

pub const MIN_PERIOD: u32 = 2;
pub const SIGMOID_EXPONENT_RANGE: (f32, f32) = (7.0, 13.0);
pub const SIGMOID_NUMERATOR_RANGE: (f32, f32) = (-5.0, 5.0);

/// Behavioural class of a neuron, in gene selector order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronKind {
    Regular,
    Inhibitory,
    Sine,
    FixedWeight,
    Dead,
    Motor,
    Sensory,
    Blinker,
    PainReceptor,
    Relay,
    Threshold,
}

impl NeuronKind {
    pub const ALL: [NeuronKind; 11] = [
        NeuronKind::Regular,
        NeuronKind::Inhibitory,
        NeuronKind::Sine,
        NeuronKind::FixedWeight,
        NeuronKind::Dead,
        NeuronKind::Motor,
        NeuronKind::Sensory,
        NeuronKind::Blinker,
        NeuronKind::PainReceptor,
        NeuronKind::Relay,
        NeuronKind::Threshold,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Round-robin mapping so every selector value is valid
    #[inline]
    pub fn from_selector(selector: u64) -> Self {
        Self::ALL[(selector % Self::COUNT as u64) as usize]
    }

    #[inline]
    pub fn selector(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            NeuronKind::Regular => "regular",
            NeuronKind::Inhibitory => "inhibitory",
            NeuronKind::Sine => "sine",
            NeuronKind::FixedWeight => "fixed-weight",
            NeuronKind::Dead => "dead",
            NeuronKind::Motor => "motor",
            NeuronKind::Sensory => "sensory",
            NeuronKind::Blinker => "blinker",
            NeuronKind::PainReceptor => "pain",
            NeuronKind::Relay => "relay",
            NeuronKind::Threshold => "threshold",
        }
    }
}

/// Rule used to adjust outgoing weights after a tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightStrategy {
    /// w += lr * (source - target)
    #[default]
    AdditiveDifference,
    /// w += lr * source * target
    StrengthBased,
}

impl WeightStrategy {
    #[inline]
    pub fn from_selector(selector: u64) -> Self {
        match selector {
            1 => WeightStrategy::StrengthBased,
            _ => WeightStrategy::AdditiveDifference,
        }
    }
}

/// Everything needed to build one neuron, decoded from a gene
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeuronSpec {
    pub kind: NeuronKind,
    pub strategy: WeightStrategy,
    pub action_id: u8,
    pub sensor_id: u8,
    /// Blinker pulse period and sine period, in ticks
    pub period: u32,
    /// Firing threshold for the threshold variant, in [0, 1]
    pub threshold: f32,
    pub relay_direction: Direction,
    pub learning_rate: f32,
    pub sigmoid_exponent: f32,
    pub sigmoid_numerator: f32,
    pub initial_weight: f32,
}

#[inline]
fn field(gene: Gene, shift: u32, mask: u64) -> u64 {
    (gene >> shift) & mask
}

/// Map an n-bit field linearly onto [lo, hi]
#[inline]
fn lerp_field(value: u64, max: u64, (lo, hi): (f32, f32)) -> f32 {
    (lo + (hi - lo) * value as f32 / max as f32).clamp(lo, hi)
}

/// Decode a gene. Total: every 64-bit value yields a valid spec.
pub fn decode_gene(gene: Gene) -> NeuronSpec {
    let period_bits = field(gene, PERIOD_SHIFT, PERIOD_MASK);

    NeuronSpec {
        kind: NeuronKind::from_selector(field(gene, VARIANT_SHIFT, VARIANT_MASK)),
        strategy: WeightStrategy::from_selector(field(gene, STRATEGY_SHIFT, STRATEGY_MASK)),
        action_id: field(gene, ACTION_SHIFT, BYTE_MASK) as u8,
        sensor_id: field(gene, SENSOR_SHIFT, BYTE_MASK) as u8,
        period: MIN_PERIOD + period_bits as u32,
        threshold: lerp_field(period_bits, PERIOD_MASK, (0.0, 1.0)),
        relay_direction: Direction::from_index(field(gene, RELAY_SHIFT, RELAY_MASK) as usize),
        learning_rate: (field(gene, LEARNING_SHIFT, LEARNING_MASK) as f32 / 1024.0)
            .clamp(0.0, 1.0),
        sigmoid_exponent: lerp_field(
            field(gene, EXPONENT_SHIFT, BYTE_MASK),
            BYTE_MASK,
            SIGMOID_EXPONENT_RANGE,
        ),
        sigmoid_numerator: lerp_field(
            field(gene, NUMERATOR_SHIFT, BYTE_MASK),
            BYTE_MASK,
            SIGMOID_NUMERATOR_RANGE,
        ),
        initial_weight: lerp_field(field(gene, WEIGHT_SHIFT, WEIGHT_MASK), WEIGHT_MASK, (-1.0, 1.0)),
    }
}

/// Replace the variant field of a gene
#[inline]
pub fn with_kind(gene: Gene, kind: NeuronKind) -> Gene {
    (gene & !(VARIANT_MASK << VARIANT_SHIFT)) | (kind.selector() << VARIANT_SHIFT)
}

/// Ordered genes, one per grid cell (reused cyclically when shorter)
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Gene>,
}

impl Genome {
    pub fn new(genes: Vec<Gene>) -> Self {
        Self { genes }
    }

    /// Independently drawn random genes
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self {
            genes: (0..len).map(|_| rng.gen::<u64>()).collect(),
        }
    }

    #[inline]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    #[inline]
    pub fn genes_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Count of each neuron kind, indexed by selector
    pub fn kind_histogram(&self) -> [usize; NeuronKind::COUNT] {
        let mut counts = [0; NeuronKind::COUNT];
        for &gene in &self.genes {
            counts[decode_gene(gene).kind as usize] += 1;
        }
        counts
    }

    /// Cyclic cursor over the genes
    pub fn provider(&self) -> GenomeProvider<'_> {
        GenomeProvider {
            genome: self,
            cursor: 0,
        }
    }
}

impl From<Vec<Gene>> for Genome {
    fn from(genes: Vec<Gene>) -> Self {
        Self::new(genes)
    }
}

/// Reads genes in order, wrapping to the first when exhausted
#[derive(Clone, Debug)]
pub struct GenomeProvider<'a> {
    genome: &'a Genome,
    cursor: usize,
}

impl GenomeProvider<'_> {
    /// Next gene, or `None` for an empty genome
    pub fn next_gene(&mut self) -> Option<Gene> {
        if self.genome.is_empty() {
            return None;
        }
        if self.cursor >= self.genome.len() {
            self.cursor = 0;
        }
        let gene = self.genome.genes[self.cursor];
        self.cursor += 1;
        Some(gene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pack(shift: u32, value: u64) -> Gene {
        value << shift
    }

    #[test]
    fn test_zero_gene() {
        let spec = decode_gene(0);
        assert_eq!(spec.kind, NeuronKind::Regular);
        assert_eq!(spec.strategy, WeightStrategy::AdditiveDifference);
        assert_eq!(spec.action_id, 0);
        assert_eq!(spec.sensor_id, 0);
        assert_eq!(spec.period, 2);
        assert_eq!(spec.threshold, 0.0);
        assert_eq!(spec.learning_rate, 0.0);
        assert_eq!(spec.sigmoid_exponent, 7.0);
        assert_eq!(spec.sigmoid_numerator, -5.0);
        assert_eq!(spec.initial_weight, -1.0);
        assert_eq!(spec.relay_direction, Direction::North);
    }

    #[test]
    fn test_all_ones_gene() {
        let spec = decode_gene(u64::MAX);
        // 15 % 11 = 4
        assert_eq!(spec.kind, NeuronKind::Dead);
        assert_eq!(spec.strategy, WeightStrategy::AdditiveDifference);
        assert_eq!(spec.action_id, 255);
        assert_eq!(spec.sensor_id, 255);
        assert_eq!(spec.period, 513);
        assert_eq!(spec.threshold, 1.0);
        assert_eq!(spec.learning_rate, 1023.0 / 1024.0);
        assert_eq!(spec.sigmoid_exponent, 13.0);
        assert_eq!(spec.sigmoid_numerator, 5.0);
        assert_eq!(spec.initial_weight, 1.0);
        assert_eq!(spec.relay_direction, Direction::NorthWest);
    }

    #[test]
    fn test_strategy_selector() {
        assert_eq!(decode_gene(1).strategy, WeightStrategy::StrengthBased);
        assert_eq!(decode_gene(2).strategy, WeightStrategy::AdditiveDifference);
        assert_eq!(decode_gene(0xF).strategy, WeightStrategy::AdditiveDifference);
    }

    #[test]
    fn test_variant_round_robin() {
        for selector in 0..16u64 {
            let spec = decode_gene(pack(VARIANT_SHIFT, selector));
            assert_eq!(spec.kind, NeuronKind::ALL[(selector % 11) as usize]);
        }
        assert_eq!(decode_gene(pack(VARIANT_SHIFT, 5)).kind, NeuronKind::Motor);
        assert_eq!(decode_gene(pack(VARIANT_SHIFT, 11)).kind, NeuronKind::Regular);
    }

    #[test]
    fn test_id_fields() {
        let gene = pack(ACTION_SHIFT, 0xAB) | pack(SENSOR_SHIFT, 0x5C);
        let spec = decode_gene(gene);
        assert_eq!(spec.action_id, 0xAB);
        assert_eq!(spec.sensor_id, 0x5C);
    }

    #[test]
    fn test_numeric_fields_match_formulas() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..1000 {
            let gene: u64 = rng.gen();
            let spec = decode_gene(gene);

            let period = ((gene >> 27) & 0x1FF) as u32 + 2;
            assert_eq!(spec.period, period);
            assert!((2..=513).contains(&spec.period));

            let lr = ((gene >> 34) & 0x3FF) as f32 / 1024.0;
            assert_eq!(spec.learning_rate, lr.clamp(0.0, 1.0));

            let exponent = 7.0 + 6.0 * ((gene >> 44) & 0xFF) as f32 / 255.0;
            assert_eq!(spec.sigmoid_exponent, exponent.clamp(7.0, 13.0));

            let numerator = -5.0 + 10.0 * ((gene >> 52) & 0xFF) as f32 / 255.0;
            assert_eq!(spec.sigmoid_numerator, numerator.clamp(-5.0, 5.0));

            assert!((-1.0..=1.0).contains(&spec.initial_weight));
            assert!((0.0..=1.0).contains(&spec.threshold));
        }
    }

    #[test]
    fn test_overlapping_fields_read_same_bits() {
        // bits 34 and 35 belong to both the period and learning-rate fields
        let gene = pack(34, 0b11);
        let spec = decode_gene(gene);
        assert_eq!(spec.period, 2 + (0b11 << 7));
        assert_eq!(spec.learning_rate, 3.0 / 1024.0);
    }

    #[test]
    fn test_decode_deterministic() {
        let gene = 0xDEAD_BEEF_CAFE_F00D;
        assert_eq!(decode_gene(gene), decode_gene(gene));
    }

    #[test]
    fn test_with_kind() {
        let gene = with_kind(u64::MAX, NeuronKind::Sensory);
        assert_eq!(decode_gene(gene).kind, NeuronKind::Sensory);
        assert_eq!(decode_gene(gene).sensor_id, 255);
        assert_eq!(gene | (0xF << 4), u64::MAX);
    }

    #[test]
    fn test_provider_wraps() {
        let genome = Genome::new(vec![10, 20, 30]);
        let mut provider = genome.provider();
        let read: Vec<_> = (0..7).map(|_| provider.next_gene().unwrap()).collect();
        assert_eq!(read, vec![10, 20, 30, 10, 20, 30, 10]);

        let empty = Genome::default();
        assert_eq!(empty.provider().next_gene(), None);
    }

    #[test]
    fn test_kind_histogram() {
        let genome = Genome::new(vec![
            with_kind(0, NeuronKind::Motor),
            with_kind(0, NeuronKind::Motor),
            with_kind(0, NeuronKind::Dead),
        ]);
        let hist = genome.kind_histogram();
        assert_eq!(hist[NeuronKind::Motor as usize], 2);
        assert_eq!(hist[NeuronKind::Dead as usize], 1);
        assert_eq!(hist.iter().sum::<usize>(), 3);
    }
}

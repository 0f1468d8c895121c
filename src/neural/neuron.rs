//! Grid cell neurons and their variant behaviour.
//!
//! A tick drives every neuron through `fire` (push the current activation to
//! the targets) and then `apply_stimulation` (commit what was received). The
//! split lets the whole grid fire from one consistent snapshot.

use super::gene::{NeuronKind, NeuronSpec, WeightStrategy};
use super::learning::WEIGHT_LIMIT;
use crate::error::EvoError;
use crate::grid::Direction;
use ndarray::Array2;

/// Grid coordinate of a neuron: [row, col]
pub type CellPos = [usize; 2];

const DEFAULT_SIGMOID_EXPONENT: f32 = 10.0;
const DEFAULT_SIGMOID_NUMERATOR: f32 = 1.0;
const DEFAULT_INITIAL_WEIGHT: f32 = 0.5;
const DEFAULT_PERIOD: u32 = 8;
const DEFAULT_THRESHOLD: f32 = 0.5;

/// Outgoing link to another cell of the same grid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub target: CellPos,
    pub weight: f32,
}

/// Where a stimulus comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Another neuron firing
    Synaptic,
    /// The outside world (sensors, pain, test probes)
    Environmental,
}

/// Variant tag plus the state only that variant needs
#[derive(Clone, Debug, PartialEq)]
pub enum NeuronVariant {
    Regular,
    Inhibitory,
    Sine { period: u32, time: u32 },
    FixedWeight,
    Dead,
    Motor { action_id: u8 },
    Sensory { sensor_id: u8 },
    Blinker { period: u32, counter: u32 },
    PainReceptor,
    Relay { direction: Direction, target: Option<CellPos> },
    Threshold { threshold: f32 },
}

impl NeuronVariant {
    pub fn kind(&self) -> NeuronKind {
        match self {
            NeuronVariant::Regular => NeuronKind::Regular,
            NeuronVariant::Inhibitory => NeuronKind::Inhibitory,
            NeuronVariant::Sine { .. } => NeuronKind::Sine,
            NeuronVariant::FixedWeight => NeuronKind::FixedWeight,
            NeuronVariant::Dead => NeuronKind::Dead,
            NeuronVariant::Motor { .. } => NeuronKind::Motor,
            NeuronVariant::Sensory { .. } => NeuronKind::Sensory,
            NeuronVariant::Blinker { .. } => NeuronKind::Blinker,
            NeuronVariant::PainReceptor => NeuronKind::PainReceptor,
            NeuronVariant::Relay { .. } => NeuronKind::Relay,
            NeuronVariant::Threshold { .. } => NeuronKind::Threshold,
        }
    }

    fn from_spec(spec: &NeuronSpec) -> Self {
        match spec.kind {
            NeuronKind::Regular => NeuronVariant::Regular,
            NeuronKind::Inhibitory => NeuronVariant::Inhibitory,
            NeuronKind::Sine => NeuronVariant::Sine {
                period: spec.period,
                time: 0,
            },
            NeuronKind::FixedWeight => NeuronVariant::FixedWeight,
            NeuronKind::Dead => NeuronVariant::Dead,
            NeuronKind::Motor => NeuronVariant::Motor {
                action_id: spec.action_id,
            },
            NeuronKind::Sensory => NeuronVariant::Sensory {
                sensor_id: spec.sensor_id,
            },
            NeuronKind::Blinker => NeuronVariant::Blinker {
                period: spec.period,
                counter: 0,
            },
            NeuronKind::PainReceptor => NeuronVariant::PainReceptor,
            NeuronKind::Relay => NeuronVariant::Relay {
                direction: spec.relay_direction,
                target: None,
            },
            NeuronKind::Threshold => NeuronVariant::Threshold {
                threshold: spec.threshold,
            },
        }
    }
}

/// One cell of a grid network
#[derive(Clone, Debug, PartialEq)]
pub struct Neuron {
    variant: NeuronVariant,
    activation: f32,
    pending: f32,
    connections: Vec<Connection>,
    strategy: WeightStrategy,
    /// Overrides the network-wide rate when set
    learning_rate: Option<f32>,
    sigmoid_exponent: f32,
    sigmoid_numerator: f32,
    initial_weight: f32,
}

impl Neuron {
    /// Neuron of the given kind with default parameters
    pub fn new(kind: NeuronKind) -> Self {
        let variant = match kind {
            NeuronKind::Sine => NeuronVariant::Sine {
                period: DEFAULT_PERIOD,
                time: 0,
            },
            NeuronKind::Blinker => NeuronVariant::Blinker {
                period: DEFAULT_PERIOD,
                counter: 0,
            },
            NeuronKind::Threshold => NeuronVariant::Threshold {
                threshold: DEFAULT_THRESHOLD,
            },
            NeuronKind::Relay => NeuronVariant::Relay {
                direction: Direction::North,
                target: None,
            },
            NeuronKind::Motor => NeuronVariant::Motor { action_id: 0 },
            NeuronKind::Sensory => NeuronVariant::Sensory { sensor_id: 0 },
            NeuronKind::Regular => NeuronVariant::Regular,
            NeuronKind::Inhibitory => NeuronVariant::Inhibitory,
            NeuronKind::FixedWeight => NeuronVariant::FixedWeight,
            NeuronKind::Dead => NeuronVariant::Dead,
            NeuronKind::PainReceptor => NeuronVariant::PainReceptor,
        };
        Self::with_variant(variant)
    }

    /// Neuron with an explicit variant and default parameters
    pub fn with_variant(variant: NeuronVariant) -> Self {
        Self {
            variant,
            activation: 0.0,
            pending: 0.0,
            connections: Vec::with_capacity(Direction::ALL.len()),
            strategy: WeightStrategy::default(),
            learning_rate: None,
            sigmoid_exponent: DEFAULT_SIGMOID_EXPONENT,
            sigmoid_numerator: DEFAULT_SIGMOID_NUMERATOR,
            initial_weight: DEFAULT_INITIAL_WEIGHT,
        }
    }

    /// Build from a decoded gene
    pub fn from_spec(spec: &NeuronSpec) -> Self {
        Self {
            strategy: spec.strategy,
            learning_rate: Some(spec.learning_rate),
            sigmoid_exponent: spec.sigmoid_exponent,
            sigmoid_numerator: spec.sigmoid_numerator,
            initial_weight: spec.initial_weight,
            ..Self::with_variant(NeuronVariant::from_spec(spec))
        }
    }

    /// Threshold neuron; the threshold must lie in [0, 1]
    pub fn threshold(threshold: f32) -> Result<Self, EvoError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EvoError::invalid(format!(
                "threshold {} outside [0, 1]",
                threshold
            )));
        }
        Ok(Self::with_variant(NeuronVariant::Threshold { threshold }))
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = Some(learning_rate.clamp(0.0, 1.0));
        self
    }

    #[inline]
    pub fn kind(&self) -> NeuronKind {
        self.variant.kind()
    }

    #[inline]
    pub fn variant(&self) -> &NeuronVariant {
        &self.variant
    }

    #[inline]
    pub fn activation(&self) -> f32 {
        self.activation
    }

    /// Input received this tick, not yet committed
    #[inline]
    pub fn pending(&self) -> f32 {
        self.pending
    }

    #[inline]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    #[inline]
    pub fn strategy(&self) -> WeightStrategy {
        self.strategy
    }

    #[inline]
    pub fn learning_rate(&self) -> Option<f32> {
        self.learning_rate
    }

    pub fn sigmoid_constants(&self) -> (f32, f32) {
        (self.sigmoid_exponent, self.sigmoid_numerator)
    }

    pub fn action_id(&self) -> Option<u8> {
        match self.variant {
            NeuronVariant::Motor { action_id } => Some(action_id),
            _ => None,
        }
    }

    pub fn sensor_id(&self) -> Option<u8> {
        match self.variant {
            NeuronVariant::Sensory { sensor_id } => Some(sensor_id),
            _ => None,
        }
    }

    /// Target of a relay's designated connection
    pub fn relay_target(&self) -> Option<CellPos> {
        match self.variant {
            NeuronVariant::Relay { target, .. } => target,
            _ => None,
        }
    }

    /// Starting weight this neuron wants toward a neighbour
    pub fn initial_weight(&self, direction: Direction) -> f32 {
        match self.variant {
            NeuronVariant::Dead => 0.0,
            NeuronVariant::Relay { direction: d, .. } if d == direction => WEIGHT_LIMIT,
            _ => self.initial_weight,
        }
    }

    /// Add an outgoing connection. A second call for the same target keeps
    /// the first weight.
    pub fn connect(&mut self, target: CellPos, weight: f32) -> Result<(), EvoError> {
        if !(-WEIGHT_LIMIT..=WEIGHT_LIMIT).contains(&weight) {
            return Err(EvoError::invalid(format!(
                "connection strength {} outside [-1, 1]",
                weight
            )));
        }
        if self.connections.iter().any(|c| c.target == target) {
            return Ok(());
        }
        self.connections.push(Connection { target, weight });
        Ok(())
    }

    /// Mark the connection a relay forwards to; ignored for other variants
    pub(crate) fn designate(&mut self, target: CellPos) {
        if let NeuronVariant::Relay { target: slot, .. } = &mut self.variant {
            *slot = Some(target);
        }
    }

    pub fn relay_direction(&self) -> Option<Direction> {
        match self.variant {
            NeuronVariant::Relay { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Accumulate input for the next commit
    pub fn stimulate(&mut self, input: f32, channel: Channel) {
        match self.variant {
            NeuronVariant::Sine { .. } | NeuronVariant::Blinker { .. } | NeuronVariant::Dead => {}
            NeuronVariant::PainReceptor => {
                if channel == Channel::Environmental {
                    self.pending += input;
                }
            }
            _ => self.pending += input,
        }
    }

    /// Push `weight * f(activation)` for every connection into `out`
    pub fn fire(&self, out: &mut Vec<(CellPos, f32)>) {
        let signal = match self.variant {
            NeuronVariant::Dead => return,
            NeuronVariant::Inhibitory => -self.activation,
            NeuronVariant::PainReceptor => 1.0,
            _ => self.activation,
        };

        match self.variant {
            NeuronVariant::Relay { target, .. } => {
                for c in &self.connections {
                    let value = if Some(c.target) == target {
                        c.weight * signal
                    } else {
                        0.0
                    };
                    out.push((c.target, value));
                }
            }
            _ => out.extend(self.connections.iter().map(|c| (c.target, c.weight * signal))),
        }
    }

    /// Commit pending input into the visible activation
    pub fn apply_stimulation(&mut self) {
        let input = std::mem::take(&mut self.pending);
        let squashed = self.sigmoid(input);
        self.activation = match &mut self.variant {
            NeuronVariant::Dead => 0.0,
            NeuronVariant::Threshold { threshold } => {
                if input >= *threshold {
                    1.0
                } else {
                    0.0
                }
            }
            NeuronVariant::Blinker { period, counter } => {
                *counter += 1;
                if *counter >= *period {
                    *counter = 0;
                    1.0
                } else {
                    0.0
                }
            }
            NeuronVariant::Sine { period, time } => {
                let period = (*period).max(1);
                *time = time.wrapping_add(1);
                (std::f32::consts::TAU * (*time % period) as f32 / period as f32).sin()
            }
            NeuronVariant::PainReceptor => input.clamp(0.0, 1.0),
            _ => squashed,
        };
    }

    /// Adjust outgoing weights from post-tick activations
    pub fn update_connection_weights(&mut self, learning_rate: f32, activations: &Array2<f32>) {
        if matches!(
            self.variant,
            NeuronVariant::Dead | NeuronVariant::FixedWeight
        ) {
            return;
        }
        let rate = self.learning_rate.unwrap_or(learning_rate);
        let source = self.activation;
        let strategy = self.strategy;
        for c in &mut self.connections {
            c.weight = strategy.apply(c.weight, source, activations[c.target], rate);
        }
    }

    /// `numerator / (1 + e^-(exponent * x - exponent / 2))`
    #[inline]
    pub fn sigmoid(&self, x: f32) -> f32 {
        let k = self.sigmoid_exponent;
        self.sigmoid_numerator / (1.0 + (-(k * x - k / 2.0)).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::gene::{decode_gene, with_kind};

    fn fired(neuron: &Neuron) -> Vec<(CellPos, f32)> {
        let mut out = Vec::new();
        neuron.fire(&mut out);
        out
    }

    fn primed(kind: NeuronKind, input: f32) -> Neuron {
        let mut n = Neuron::new(kind);
        n.stimulate(input, Channel::Environmental);
        n.apply_stimulation();
        n
    }

    #[test]
    fn test_connect_rejects_out_of_range() {
        let mut n = Neuron::new(NeuronKind::Regular);
        assert!(n.connect([0, 1], 1.5).is_err());
        assert!(n.connect([0, 1], -1.01).is_err());
        assert!(n.connect([0, 1], f32::NAN).is_err());
        assert!(n.connect([0, 1], 1.0).is_ok());
        assert!(n.connect([0, 2], -1.0).is_ok());
        assert_eq!(n.connections().len(), 2);
    }

    #[test]
    fn test_connect_idempotent() {
        let mut n = Neuron::new(NeuronKind::Regular);
        n.connect([1, 1], 0.3).unwrap();
        n.connect([1, 1], -0.9).unwrap();
        assert_eq!(n.connections(), &[Connection { target: [1, 1], weight: 0.3 }]);
    }

    #[test]
    fn test_regular_sigmoid() {
        let n = primed(NeuronKind::Regular, 0.5);
        // midpoint of the default curve
        assert!((n.activation() - 0.5).abs() < 1e-6);
        assert_eq!(n.pending(), 0.0);

        let n = primed(NeuronKind::Regular, 1.0);
        assert!(n.activation() > 0.99);
    }

    #[test]
    fn test_inhibitory_fires_negated() {
        let mut n = primed(NeuronKind::Inhibitory, 1.0);
        n.connect([0, 1], 0.5).unwrap();
        let out = fired(&n);
        assert!((out[0].1 + 0.5 * n.activation()).abs() < 1e-6);
        assert!(out[0].1 < 0.0);
    }

    #[test]
    fn test_sine_ignores_stimulation() {
        let mut n = Neuron::new(NeuronKind::Sine);
        n.stimulate(100.0, Channel::Synaptic);
        n.stimulate(100.0, Channel::Environmental);
        assert_eq!(n.pending(), 0.0);

        let mut values = Vec::new();
        for _ in 0..DEFAULT_PERIOD {
            n.apply_stimulation();
            values.push(n.activation());
        }
        // period 8: quarter period peaks at 1
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!(values[DEFAULT_PERIOD as usize - 1].abs() < 1e-5);
    }

    #[test]
    fn test_dead_is_inert() {
        let mut n = Neuron::new(NeuronKind::Dead);
        n.connect([0, 1], 0.7).unwrap();
        n.stimulate(5.0, Channel::Environmental);
        n.apply_stimulation();
        assert_eq!(n.activation(), 0.0);
        assert!(fired(&n).is_empty());

        let before = n.connections().to_vec();
        n.update_connection_weights(1.0, &Array2::from_elem((1, 2), 1.0));
        assert_eq!(n.connections(), before.as_slice());
        assert_eq!(n.initial_weight(Direction::East), 0.0);
    }

    #[test]
    fn test_fixed_weight_never_updates() {
        let mut n = primed(NeuronKind::FixedWeight, 1.0);
        n.connect([0, 1], 0.2).unwrap();
        n.update_connection_weights(1.0, &Array2::zeros((1, 2)));
        assert_eq!(n.connections()[0].weight, 0.2);
    }

    #[test]
    fn test_blinker_pulses() {
        let mut n = Neuron::with_variant(NeuronVariant::Blinker {
            period: 3,
            counter: 0,
        });
        let pulses: Vec<f32> = (0..7)
            .map(|_| {
                n.stimulate(1.0, Channel::Synaptic);
                n.apply_stimulation();
                n.activation()
            })
            .collect();
        assert_eq!(pulses, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_pain_receptor_channels() {
        let mut n = Neuron::new(NeuronKind::PainReceptor);
        n.stimulate(1.0, Channel::Synaptic);
        assert_eq!(n.pending(), 0.0);
        n.stimulate(1.0, Channel::Environmental);
        n.apply_stimulation();
        assert_eq!(n.activation(), 1.0);

        // fires 1 regardless of activation
        let mut quiet = Neuron::new(NeuronKind::PainReceptor);
        quiet.connect([2, 2], 0.4).unwrap();
        assert_eq!(fired(&quiet), vec![([2, 2], 0.4)]);
    }

    #[test]
    fn test_relay_forwards_to_designated_only() {
        let mut n = primed(NeuronKind::Relay, 1.0);
        n.connect([0, 1], 0.5).unwrap();
        n.connect([1, 0], 0.5).unwrap();
        n.designate([1, 0]);

        let out = fired(&n);
        assert_eq!(out[0], ([0, 1], 0.0));
        assert_eq!(out[1].0, [1, 0]);
        assert!((out[1].1 - 0.5 * n.activation()).abs() < 1e-6);
        assert_eq!(n.initial_weight(Direction::North), 1.0);
        assert_eq!(n.initial_weight(Direction::South), DEFAULT_INITIAL_WEIGHT);
    }

    #[test]
    fn test_threshold_gate() {
        assert!(Neuron::threshold(1.2).is_err());
        assert!(Neuron::threshold(-0.1).is_err());

        let mut n = Neuron::threshold(0.4).unwrap();
        n.stimulate(0.39, Channel::Synaptic);
        n.apply_stimulation();
        assert_eq!(n.activation(), 0.0);
        n.stimulate(0.4, Channel::Synaptic);
        n.apply_stimulation();
        assert_eq!(n.activation(), 1.0);
    }

    #[test]
    fn test_learning_rate_override() {
        let mut n = primed(NeuronKind::Regular, 1.0).with_learning_rate(0.0);
        n.connect([0, 1], 0.2).unwrap();
        n.update_connection_weights(1.0, &Array2::zeros((1, 2)));
        assert_eq!(n.connections()[0].weight, 0.2);

        let mut n = primed(NeuronKind::Regular, 1.0);
        n.connect([0, 1], 0.2).unwrap();
        let source = n.activation();
        n.update_connection_weights(0.1, &Array2::zeros((1, 2)));
        assert!((n.connections()[0].weight - (0.2 + 0.1 * source)).abs() < 1e-6);
    }

    #[test]
    fn test_from_spec_reads_gene_fields() {
        let gene = with_kind(0x0123_4567_89AB_CDEF, NeuronKind::Motor);
        let spec = decode_gene(gene);
        let n = Neuron::from_spec(&spec);

        assert_eq!(n.kind(), NeuronKind::Motor);
        assert_eq!(n.action_id(), Some(spec.action_id));
        assert_eq!(n.sensor_id(), None);
        assert_eq!(n.learning_rate(), Some(spec.learning_rate));
        assert_eq!(
            n.sigmoid_constants(),
            (spec.sigmoid_exponent, spec.sigmoid_numerator)
        );
        assert_eq!(n.strategy(), spec.strategy);
    }
}

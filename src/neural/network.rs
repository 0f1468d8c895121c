//! Toroidal grid of neurons and its tick cycle.

use super::gene::{decode_gene, Genome, GenomeProvider, NeuronKind};
use super::neuron::{CellPos, Channel, Neuron};
use crate::error::EvoError;
use crate::grid::Direction;
use ndarray::Array2;

/// Supplies the neuron for each grid cell, in row-major order
pub trait NeuronProvider {
    fn provide(&mut self, row: usize, col: usize) -> Neuron;
}

/// Genes are consumed cyclically; an empty genome yields regular neurons
impl NeuronProvider for GenomeProvider<'_> {
    fn provide(&mut self, _row: usize, _col: usize) -> Neuron {
        match self.next_gene() {
            Some(gene) => Neuron::from_spec(&decode_gene(gene)),
            None => Neuron::new(NeuronKind::Regular),
        }
    }
}

/// Every cell gets a default neuron of one kind
#[derive(Clone, Copy, Debug)]
pub struct UniformProvider(pub NeuronKind);

impl NeuronProvider for UniformProvider {
    fn provide(&mut self, _row: usize, _col: usize) -> Neuron {
        Neuron::new(self.0)
    }
}

/// Fixed rows x cols grid; each cell links to its 8 wrap-around neighbours
#[derive(Clone, Debug)]
pub struct GridNetwork {
    cells: Array2<Neuron>,
    /// Reused buffer of (target, value) pairs produced while firing
    scratch: Vec<(CellPos, f32)>,
}

impl GridNetwork {
    /// Build and wire a network. Connectivity is fixed from here on.
    pub fn new<P: NeuronProvider + ?Sized>(
        rows: usize,
        cols: usize,
        provider: &mut P,
    ) -> Result<Self, EvoError> {
        if rows == 0 || cols == 0 {
            return Err(EvoError::invalid(format!(
                "network dimensions must be non-zero, got {}x{}",
                rows, cols
            )));
        }

        let cells = Array2::from_shape_fn((rows, cols), |(r, c)| provider.provide(r, c));
        let mut network = Self {
            cells,
            scratch: Vec::with_capacity(rows * cols * Direction::ALL.len()),
        };
        network.wire()?;
        Ok(network)
    }

    /// Network whose neurons are decoded from `genome`, reused cyclically
    pub fn from_genome(rows: usize, cols: usize, genome: &Genome) -> Result<Self, EvoError> {
        Self::new(rows, cols, &mut genome.provider())
    }

    fn wire(&mut self) -> Result<(), EvoError> {
        let (rows, cols) = self.cells.dim();
        for r in 0..rows {
            for c in 0..cols {
                for direction in Direction::ALL {
                    let target = self.neighbor([r, c], direction);
                    // only happens when a dimension is 1
                    if target == [r, c] {
                        continue;
                    }
                    let neuron = &mut self.cells[[r, c]];
                    let weight = neuron.initial_weight(direction);
                    neuron.connect(target, weight)?;
                    if neuron.relay_direction() == Some(direction) {
                        neuron.designate(target);
                    }
                }
                // designated direction folded back onto the cell itself
                let neuron = &mut self.cells[[r, c]];
                if neuron.relay_direction().is_some() && neuron.relay_target().is_none() {
                    if let Some(first) = neuron.connections().first().map(|c| c.target) {
                        neuron.designate(first);
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    /// Neighbour of a cell, wrapping rows and columns independently
    #[inline]
    pub fn neighbor(&self, [r, c]: CellPos, direction: Direction) -> CellPos {
        let (dx, dy) = direction.offset();
        let rows = self.rows() as i64;
        let cols = self.cols() as i64;
        [
            (r as i64 + dy as i64).rem_euclid(rows) as usize,
            (c as i64 + dx as i64).rem_euclid(cols) as usize,
        ]
    }

    fn check(&self, row: usize, col: usize) -> Result<CellPos, EvoError> {
        if row >= self.rows() || col >= self.cols() {
            return Err(EvoError::invalid(format!(
                "cell ({}, {}) outside {}x{} network",
                row,
                col,
                self.rows(),
                self.cols()
            )));
        }
        Ok([row, col])
    }

    pub fn neuron(&self, row: usize, col: usize) -> Result<&Neuron, EvoError> {
        let pos = self.check(row, col)?;
        Ok(&self.cells[pos])
    }

    pub fn neuron_mut(&mut self, row: usize, col: usize) -> Result<&mut Neuron, EvoError> {
        let pos = self.check(row, col)?;
        Ok(&mut self.cells[pos])
    }

    /// External input into one cell (environmental channel)
    pub fn stimulate(&mut self, row: usize, col: usize, value: f32) -> Result<(), EvoError> {
        let pos = self.check(row, col)?;
        self.cells[pos].stimulate(value, Channel::Environmental);
        Ok(())
    }

    /// One tick: every cell fires from the pre-tick state, then every cell
    /// commits what it received.
    pub fn fire_and_update(&mut self) {
        let mut signals = std::mem::take(&mut self.scratch);
        signals.clear();

        for neuron in self.cells.iter() {
            neuron.fire(&mut signals);
        }
        for &(target, value) in &signals {
            self.cells[target].stimulate(value, Channel::Synaptic);
        }
        for neuron in self.cells.iter_mut() {
            neuron.apply_stimulation();
        }

        self.scratch = signals;
    }

    /// Weight adaptation from the post-tick activations; run after
    /// [`fire_and_update`](Self::fire_and_update).
    pub fn update_all_weights(&mut self, learning_rate: f32) {
        let activations = self.activations();
        for neuron in self.cells.iter_mut() {
            neuron.update_connection_weights(learning_rate, &activations);
        }
    }

    pub fn activations(&self) -> Array2<f32> {
        self.cells.map(Neuron::activation)
    }

    /// Row-major (position, neuron) pairs
    pub fn iter(&self) -> impl Iterator<Item = (CellPos, &Neuron)> {
        self.cells.indexed_iter().map(|((r, c), n)| ([r, c], n))
    }

    /// Positions of all neurons of a kind, row-major
    pub fn positions_of(&self, kind: NeuronKind) -> Vec<CellPos> {
        self.iter()
            .filter(|(_, n)| n.kind() == kind)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// True when every activation and weight is finite
    pub fn is_valid(&self) -> bool {
        self.cells.iter().all(|n| {
            n.activation().is_finite() && n.connections().iter().all(|c| c.weight.is_finite())
        })
    }
}

//! Read-only views of training state for display.

use crate::neural::{GridNetwork, NeuronKind};
use crate::stats::EpochStats;
use crate::world::World;
use serde::{Deserialize, Serialize};

/// What the training loop is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Starting,
    GeneratingWorlds,
    Evaluating,
    Evolving,
    Reinitializing,
    Finished,
    Cancelled,
    Failed,
}

impl Phase {
    /// Human readable progress label
    pub fn label(self) -> &'static str {
        match self {
            Phase::Starting => "Starting",
            Phase::GeneratingWorlds => "Generating worlds",
            Phase::Evaluating => "Evaluating genomes",
            Phase::Evolving => "Evolving pool",
            Phase::Reinitializing => "Reinitializing pool",
            Phase::Finished => "Finished",
            Phase::Cancelled => "Cancelled",
            Phase::Failed => "Failed",
        }
    }

    /// No more snapshots follow one of these
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Cancelled | Phase::Failed)
    }
}

/// Neuron kinds and activations of a grid brain, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkView {
    pub rows: usize,
    pub cols: usize,
    pub kinds: Vec<NeuronKind>,
    pub activations: Vec<f32>,
    /// Designated target of each relay, as (row, col) pairs
    pub relay_links: Vec<([usize; 2], [usize; 2])>,
}

impl NetworkView {
    pub fn from_network(network: &GridNetwork) -> Self {
        let mut kinds = Vec::with_capacity(network.rows() * network.cols());
        let mut activations = Vec::with_capacity(kinds.capacity());
        let mut relay_links = Vec::new();
        for (pos, neuron) in network.iter() {
            kinds.push(neuron.kind());
            activations.push(neuron.activation());
            if let Some(target) = neuron.relay_target() {
                relay_links.push((pos, target));
            }
        }
        Self {
            rows: network.rows(),
            cols: network.cols(),
            kinds,
            activations,
            relay_links,
        }
    }
}

/// Walls and agent positions of a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldView {
    pub width: usize,
    pub height: usize,
    /// Row-major, true = wall
    pub walls: Vec<bool>,
    pub agents: Vec<(i32, i32)>,
    pub time: u64,
}

impl WorldView {
    pub fn from_world(world: &World) -> Self {
        let walls = world.walls();
        Self {
            width: walls.width(),
            height: walls.height(),
            walls: walls.to_vec(),
            agents: world.agents().iter().map(|a| a.position()).collect(),
            time: world.time(),
        }
    }
}

/// Everything a front end needs to draw progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub phase: Phase,
    pub epoch: usize,
    pub num_epochs: usize,
    pub best_fitness: f32,
    pub last_stats: Option<EpochStats>,
    pub best_network: Option<NetworkView>,
    /// Best genome running in a recent world
    pub live_network: Option<NetworkView>,
    pub live_world: Option<WorldView>,
}

impl TrainingSnapshot {
    /// Snapshot carrying only progress counters
    pub fn progress(phase: Phase, epoch: usize, num_epochs: usize, best_fitness: f32) -> Self {
        Self {
            phase,
            epoch,
            num_epochs,
            best_fitness,
            last_stats: None,
            best_network: None,
            live_network: None,
            live_world: None,
        }
    }

    pub fn phase_label(&self) -> &'static str {
        self.phase.label()
    }
}

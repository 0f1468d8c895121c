//! Agent: a grid brain bound to a position in a wall world.
//!
//! Sensory and motor neurons are bound to one of the eight compass
//! directions by their id byte (32 ids per direction). Sensors see whether
//! the neighbouring cell in their direction is a wall; motors move the agent
//! one cell in theirs.

use crate::config::FitnessConfig;
use crate::error::EvoError;
use crate::grid::{Direction, WallGrid};
use crate::neural::{CellPos, GridNetwork, NeuronKind};
use std::collections::HashSet;

/// Motor activation needed to trigger a move
pub const MOTOR_THRESHOLD: f32 = 0.5;

/// A neuron cell bound to a compass direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub cell: CellPos,
    pub direction: Direction,
}

/// What happened during one agent step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub moves: u32,
    pub blocked: u32,
}

/// An agent in the simulation
#[derive(Clone, Debug)]
pub struct Agent {
    pub brain: GridNetwork,
    x: i32,
    y: i32,
    sensors: Vec<Binding>,
    motors: Vec<Binding>,
    pain: Vec<CellPos>,

    // Statistics
    visited: HashSet<(i32, i32)>,
    idle_steps: u32,
    collisions: u32,
    steps: u32,
}

impl Agent {
    /// Place a brain at (x, y) and bind its sensors and motors
    pub fn new(brain: GridNetwork, x: i32, y: i32) -> Self {
        let mut sensors = Vec::new();
        let mut motors = Vec::new();
        for (cell, neuron) in brain.iter() {
            if let Some(id) = neuron.sensor_id() {
                sensors.push(Binding {
                    cell,
                    direction: Direction::from_id(id),
                });
            }
            if let Some(id) = neuron.action_id() {
                motors.push(Binding {
                    cell,
                    direction: Direction::from_id(id),
                });
            }
        }
        let pain = brain.positions_of(NeuronKind::PainReceptor);

        let mut visited = HashSet::new();
        visited.insert((x, y));

        Self {
            brain,
            x,
            y,
            sensors,
            motors,
            pain,
            visited,
            idle_steps: 0,
            collisions: 0,
            steps: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn sensors(&self) -> &[Binding] {
        &self.sensors
    }

    pub fn motors(&self) -> &[Binding] {
        &self.motors
    }

    /// Number of distinct cells the agent has stood on, start included
    pub fn cells_visited(&self) -> usize {
        self.visited.len()
    }

    pub fn idle_steps(&self) -> u32 {
        self.idle_steps
    }

    /// Moves blocked by a wall
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Feed 1.0 / 0.0 into every sensor depending on the wall next to the agent
    pub fn sense(&mut self, walls: &WallGrid) -> Result<(), EvoError> {
        for binding in &self.sensors {
            let (nx, ny) = binding.direction.step(self.x, self.y);
            let value = if walls.is_wall(nx, ny) { 1.0 } else { 0.0 };
            let [r, c] = binding.cell;
            self.brain.stimulate(r, c, value)?;
        }
        Ok(())
    }

    /// Run the brain for one tick, optionally adapting its weights
    pub fn think(&mut self, learning_rate: Option<f32>) {
        self.brain.fire_and_update();
        if let Some(rate) = learning_rate {
            self.brain.update_all_weights(rate);
        }
    }

    /// Move once for every motor above the threshold. Blocked moves hurt.
    pub fn act(&mut self, walls: &WallGrid) -> Result<StepReport, EvoError> {
        let mut report = StepReport::default();
        for binding in &self.motors {
            let [r, c] = binding.cell;
            if self.brain.neuron(r, c)?.activation() <= MOTOR_THRESHOLD {
                continue;
            }
            let (nx, ny) = binding.direction.step(self.x, self.y);
            if walls.is_wall(nx, ny) {
                report.blocked += 1;
            } else {
                self.x = nx;
                self.y = ny;
                self.visited.insert((nx, ny));
                report.moves += 1;
            }
        }

        if report.blocked > 0 {
            for &[r, c] in &self.pain {
                self.brain.stimulate(r, c, 1.0)?;
            }
        }
        if report.moves == 0 {
            self.idle_steps += 1;
        }
        self.collisions += report.blocked;
        self.steps += 1;
        Ok(report)
    }

    /// Sense, think and act in one go
    pub fn step(&mut self, walls: &WallGrid, learning_rate: Option<f32>) -> Result<StepReport, EvoError> {
        self.sense(walls)?;
        self.think(learning_rate);
        self.act(walls)
    }

    /// Raw score of this run; may be negative
    pub fn score(&self, fitness: &FitnessConfig) -> f32 {
        self.visited.len() as f32
            - fitness.cost_of_not_moving * self.idle_steps as f32
            - fitness.error_weight * self.collisions as f32
    }
}

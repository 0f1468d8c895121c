//! Navigation simulation - agents steered by grid brains in a wall world.

use crate::config::WorldConfig;
use crate::error::EvoError;
use crate::grid::WallGrid;
use crate::neural::GridNetwork;
use crate::organism::{Agent, StepReport};
use rand::Rng;
use rayon::prelude::*;

/// A wall grid and the agents moving through it
#[derive(Clone, Debug)]
pub struct World {
    walls: WallGrid,
    agents: Vec<Agent>,

    /// Weight adaptation after each tick; None disables learning
    learning_rate: Option<f32>,

    // State
    time: u64,
}

impl World {
    /// World over an existing wall grid, no agents yet
    pub fn new(walls: WallGrid) -> Self {
        Self {
            walls,
            agents: Vec::new(),
            learning_rate: None,
            time: 0,
        }
    }

    /// Generate a fresh wall grid
    pub fn random<R: Rng + ?Sized>(config: &WorldConfig, rng: &mut R) -> Self {
        Self::new(WallGrid::random(config, rng))
    }

    pub fn with_learning(mut self, learning_rate: Option<f32>) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Put a brain on a free cell; returns the agent index
    pub fn place_agent(&mut self, brain: GridNetwork, x: i32, y: i32) -> Result<usize, EvoError> {
        if self.walls.is_wall(x, y) {
            return Err(EvoError::invalid(format!(
                "cannot place agent on wall at ({}, {})",
                x, y
            )));
        }
        self.agents.push(Agent::new(brain, x, y));
        Ok(self.agents.len() - 1)
    }

    /// Put a brain on a random free cell
    pub fn spawn_agent<R: Rng + ?Sized>(
        &mut self,
        brain: GridNetwork,
        rng: &mut R,
    ) -> Result<usize, EvoError> {
        let (x, y) = self.walls.random_empty_cell(rng)?;
        self.place_agent(brain, x, y)
    }

    /// Advance every agent by one sense / tick / move cycle
    pub fn step(&mut self) -> Result<Vec<StepReport>, EvoError> {
        let walls = &self.walls;
        let rate = self.learning_rate;
        let reports = self
            .agents
            .par_iter_mut()
            .map(|agent| agent.step(walls, rate))
            .collect::<Result<Vec<_>, _>>()?;
        self.time += 1;
        Ok(reports)
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: usize) -> Result<(), EvoError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, steps: usize, mut callback: F) -> Result<(), EvoError>
    where
        F: FnMut(&World, usize),
    {
        for i in 0..steps {
            self.step()?;
            callback(self, i);
        }
        Ok(())
    }

    pub fn walls(&self) -> &WallGrid {
        &self.walls
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    /// Steps taken so far
    pub fn time(&self) -> u64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::neural::gene::with_kind;
    use crate::neural::{Genome, NeuronKind, UniformProvider};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_config() -> WorldConfig {
        WorldConfig {
            width: 20,
            height: 20,
            wall_density: 0.1,
            min_room_size: 3,
            max_room_size: 6,
            num_rooms: 2,
            num_random_walls: 2,
        }
    }

    /// Single east-bound motor with the largest sigmoid numerator
    fn eastward_brain() -> GridNetwork {
        let motor = with_kind(
            ((Direction::East.index() as u64 * 32) << 11) | (0xFF << 52) | (0xF << 60),
            NeuronKind::Motor,
        );
        GridNetwork::from_genome(1, 1, &Genome::new(vec![motor])).unwrap()
    }

    #[test]
    fn test_place_agent_rejects_wall() {
        let mut walls = WallGrid::empty(3, 3);
        walls.set_wall(1, 1, true);
        let mut world = World::new(walls);
        let brain = GridNetwork::new(2, 2, &mut UniformProvider(NeuronKind::Regular)).unwrap();

        assert!(world.place_agent(brain.clone(), 1, 1).is_err());
        assert!(world.place_agent(brain.clone(), -1, 0).is_err());
        assert_eq!(world.place_agent(brain, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_spawn_needs_free_cell() {
        let mut walls = WallGrid::empty(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                walls.set_wall(x, y, true);
            }
        }
        let mut world = World::new(walls);
        let brain = GridNetwork::new(2, 2, &mut UniformProvider(NeuronKind::Regular)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            world.spawn_agent(brain, &mut rng),
            Err(EvoError::EmptyResource(_))
        ));
    }

    #[test]
    fn test_step_advances_time() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut world = World::random(&test_config(), &mut rng);
        let brain = GridNetwork::new(3, 3, &mut UniformProvider(NeuronKind::Regular)).unwrap();
        world.spawn_agent(brain, &mut rng).unwrap();

        world.run(10).unwrap();
        assert_eq!(world.time(), 10);
        assert_eq!(world.agent(0).unwrap().steps(), 10);
    }

    #[test]
    fn test_agent_walks_until_boundary() {
        let mut world = World::new(WallGrid::empty(4, 1));
        world.place_agent(eastward_brain(), 0, 0).unwrap();

        // keep the lone motor driven from outside
        let mut positions = Vec::new();
        for _ in 0..5 {
            world.agents[0].brain.stimulate(0, 0, 5.0).unwrap();
            world.step().unwrap();
            positions.push(world.agent(0).unwrap().position());
        }

        assert_eq!(positions, vec![(1, 0), (2, 0), (3, 0), (3, 0), (3, 0)]);
        let agent = world.agent(0).unwrap();
        assert_eq!(agent.cells_visited(), 4);
        assert_eq!(agent.collisions(), 2);
    }

    #[test]
    fn test_callback_sees_every_step() {
        let mut world = World::new(WallGrid::empty(5, 5));
        let brain = GridNetwork::new(2, 2, &mut UniformProvider(NeuronKind::Regular)).unwrap();
        world.place_agent(brain, 2, 2).unwrap();

        let mut seen = Vec::new();
        world
            .run_with_callback(3, |w, i| seen.push((i, w.time())))
            .unwrap();
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3)]);
    }
}

//! Wall grid the agents navigate, plus compass directions shared with the brain grid.

use crate::config::WorldConfig;
use crate::error::EvoError;
use crate::genetics::crossover::unit_rate;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The eight compass directions, clockwise from north
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Width of one octant band in the 0..=255 sensor/action ID space
    pub const ID_BAND: u8 = 32;

    /// (dx, dy) step; y grows southward
    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wraps, so any index is accepted
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Octant bound to a sensor or action ID (N = 0..=31, NE = 32..=63, ...)
    #[inline]
    pub fn from_id(id: u8) -> Self {
        Self::ALL[(id / Self::ID_BAND) as usize]
    }

    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 4)
    }

    /// Short compass label (N, NE, ...)
    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        }
    }

    /// Step from a position in this direction (no wrapping)
    #[inline]
    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.offset();
        (x + dx, y + dy)
    }
}

/// Boolean wall map; `true` marks a wall. Anything outside the grid is a wall.
#[derive(Clone, Debug, PartialEq)]
pub struct WallGrid {
    /// cells[[y, x]]
    cells: Array2<bool>,
}

impl WallGrid {
    /// Create a grid with no walls
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            cells: Array2::from_elem((height, width), false),
        }
    }

    /// Generate a world: rooms, then diagonal walls, then density scatter.
    ///
    /// Each pass only adds walls, so later passes never open up earlier ones.
    pub fn random<R: Rng + ?Sized>(config: &WorldConfig, rng: &mut R) -> Self {
        let mut grid = Self::empty(config.width, config.height);
        if grid.cells.is_empty() {
            return grid;
        }

        for _ in 0..config.num_rooms {
            grid.place_room(config.min_room_size, config.max_room_size, rng);
        }
        for _ in 0..config.num_random_walls {
            grid.place_diagonal(config.min_room_size, config.max_room_size, rng);
        }
        grid.scatter(config.wall_density, rng);

        grid
    }

    /// Hollow rectangle with random size in [min, max] per side
    fn place_room<R: Rng + ?Sized>(&mut self, min: usize, max: usize, rng: &mut R) {
        let w = rng.gen_range(min..=max.max(min)) as i32;
        let h = rng.gen_range(min..=max.max(min)) as i32;
        if w == 0 || h == 0 {
            return;
        }
        let x0 = rng.gen_range(0..self.width()) as i32;
        let y0 = rng.gen_range(0..self.height()) as i32;

        for x in x0..x0 + w {
            self.set_wall(x, y0, true);
            self.set_wall(x, y0 + h - 1, true);
        }
        for y in y0..y0 + h {
            self.set_wall(x0, y, true);
            self.set_wall(x0 + w - 1, y, true);
        }
    }

    /// Diagonal line in one of the four diagonal directions
    fn place_diagonal<R: Rng + ?Sized>(&mut self, min: usize, max: usize, rng: &mut R) {
        const DIAGONALS: [Direction; 4] = [
            Direction::NorthEast,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::NorthWest,
        ];
        let length = rng.gen_range(min..=max.max(min));
        let mut x = rng.gen_range(0..self.width()) as i32;
        let mut y = rng.gen_range(0..self.height()) as i32;
        let direction = DIAGONALS[rng.gen_range(0..DIAGONALS.len())];

        for _ in 0..length {
            if !self.in_bounds(x, y) {
                break;
            }
            self.set_wall(x, y, true);
            (x, y) = direction.step(x, y);
        }
    }

    /// Turn each free cell into a wall with probability `density`
    fn scatter<R: Rng + ?Sized>(&mut self, density: f32, rng: &mut R) {
        let density = unit_rate(density as f64);
        for cell in self.cells.iter_mut() {
            if !*cell && rng.gen_bool(density) {
                *cell = true;
            }
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    /// Out-of-bounds coordinates count as walls
    #[inline]
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return true;
        }
        self.cells[[y as usize, x as usize]]
    }

    /// Writes outside the grid are ignored
    #[inline]
    pub fn set_wall(&mut self, x: i32, y: i32, wall: bool) {
        if self.in_bounds(x, y) {
            self.cells[[y as usize, x as usize]] = wall;
        }
    }

    /// Pick a free cell uniformly at random
    pub fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(i32, i32), EvoError> {
        let empty: Vec<(i32, i32)> = self
            .cells
            .indexed_iter()
            .filter(|(_, &wall)| !wall)
            .map(|((y, x), _)| (x as i32, y as i32))
            .collect();

        empty.choose(rng).copied().ok_or_else(|| {
            EvoError::EmptyResource(format!(
                "no empty cell in {}x{} world",
                self.width(),
                self.height()
            ))
        })
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|&&wall| wall).count()
    }

    /// Fraction of cells that are walls
    pub fn wall_fraction(&self) -> f32 {
        if self.cells.is_empty() {
            return 1.0;
        }
        self.wall_count() as f32 / self.cells.len() as f32
    }

    /// Row-major copy of the cells, for display
    pub fn to_vec(&self) -> Vec<bool> {
        self.cells.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world_config(width: usize, height: usize) -> WorldConfig {
        WorldConfig {
            width,
            height,
            wall_density: 0.0,
            min_room_size: 3,
            max_room_size: 6,
            num_rooms: 0,
            num_random_walls: 0,
        }
    }

    #[test]
    fn test_direction_ids() {
        assert_eq!(Direction::from_id(0), Direction::North);
        assert_eq!(Direction::from_id(31), Direction::North);
        assert_eq!(Direction::from_id(32), Direction::NorthEast);
        assert_eq!(Direction::from_id(128), Direction::South);
        assert_eq!(Direction::from_id(255), Direction::NorthWest);
        assert_eq!(Direction::East.opposite(), Direction::West);
        assert_eq!(Direction::NorthEast.opposite(), Direction::SouthWest);
    }

    #[test]
    fn test_out_of_bounds_is_wall() {
        let grid = WallGrid::empty(5, 4);
        assert!(!grid.is_wall(0, 0));
        assert!(!grid.is_wall(4, 3));
        assert!(grid.is_wall(-1, 0));
        assert!(grid.is_wall(0, -1));
        assert!(grid.is_wall(5, 0));
        assert!(grid.is_wall(0, 4));
    }

    #[test]
    fn test_set_wall() {
        let mut grid = WallGrid::empty(5, 5);
        grid.set_wall(2, 3, true);
        grid.set_wall(10, 10, true);
        assert!(grid.is_wall(2, 3));
        assert_eq!(grid.wall_count(), 1);
    }

    #[test]
    fn test_no_empty_cell() {
        let mut config = world_config(4, 4);
        config.wall_density = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = WallGrid::random(&config, &mut rng);

        assert_eq!(grid.wall_count(), 16);
        assert!(matches!(
            grid.random_empty_cell(&mut rng),
            Err(EvoError::EmptyResource(_))
        ));
    }

    #[test]
    fn test_random_empty_cell_is_free() {
        let mut config = world_config(20, 20);
        config.wall_density = 0.5;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let grid = WallGrid::random(&config, &mut rng);

        for _ in 0..50 {
            let (x, y) = grid.random_empty_cell(&mut rng).unwrap();
            assert!(!grid.is_wall(x, y));
        }
    }

    #[test]
    fn test_nan_density_places_no_walls() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut config = world_config(10, 10);
        config.wall_density = f32::NAN;
        let grid = WallGrid::random(&config, &mut rng);
        assert_eq!(grid.wall_count(), 0);
    }

    #[test]
    fn test_density_converges() {
        let mut config = world_config(200, 200);
        config.wall_density = 0.3;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let grid = WallGrid::random(&config, &mut rng);

        let fraction = grid.wall_fraction();
        assert!((fraction - 0.3).abs() < 0.02, "fraction = {}", fraction);
    }

    #[test]
    fn test_rooms_and_walls_add_walls() {
        let mut config = world_config(30, 30);
        config.num_rooms = 3;
        config.num_random_walls = 3;
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let grid = WallGrid::random(&config, &mut rng);

        assert!(grid.wall_count() > 0);
        assert!(grid.wall_fraction() < 1.0);
    }

    #[test]
    fn test_generation_is_seeded() {
        let mut config = world_config(25, 15);
        config.num_rooms = 2;
        config.num_random_walls = 4;
        config.wall_density = 0.1;

        let a = WallGrid::random(&config, &mut ChaCha8Rng::seed_from_u64(9));
        let b = WallGrid::random(&config, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}

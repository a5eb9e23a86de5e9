//! Snake environment: one arena, one snake, one food cell.
//!
//! A network steers the snake with relative turns. `observe` yields
//! [`OBSERVATION_SIZE`] features and `apply_decision` expects
//! [`ACTION_COUNT`] outputs (turn left, straight, turn right).
//!
//! Observation layout:
//!
//! | idx  | feature                                   |
//! |------|-------------------------------------------|
//! | 0..3 | danger straight, right, left              |
//! | 3..7 | heading one-hot: left, right, up, down    |
//! | 7..11| food left, right, above, below the head   |
//!
//! Walls and body cells are dangerous, except the tail, which moves away on
//! the same tick.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::pos::Pos;

pub const OBSERVATION_SIZE: usize = 11;
pub const ACTION_COUNT: usize = 3;

const INITIAL_LENGTH: i32 = 3;
// rejection draws before falling back to scanning for free cells
const FOOD_SAMPLE_ATTEMPTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub fn turn_left(self) -> Dir {
        match self {
            Dir::Up => Dir::Left,
            Dir::Left => Dir::Down,
            Dir::Down => Dir::Right,
            Dir::Right => Dir::Up,
        }
    }

    pub fn turn_right(self) -> Dir {
        match self {
            Dir::Up => Dir::Right,
            Dir::Right => Dir::Down,
            Dir::Down => Dir::Left,
            Dir::Left => Dir::Up,
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

/// Relative steering decision produced by a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Left,
    Straight,
    Right,
}

impl Turn {
    pub fn from_index(index: usize) -> Option<Turn> {
        match index {
            0 => Some(Turn::Left),
            1 => Some(Turn::Straight),
            2 => Some(Turn::Right),
            _ => None,
        }
    }

    pub fn apply(self, dir: Dir) -> Dir {
        match self {
            Turn::Left => dir.turn_left(),
            Turn::Straight => dir,
            Turn::Right => dir.turn_right(),
        }
    }
}

/// Playing field measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    pub cols: i32,
    pub rows: i32,
    /// Pixel size of one cell; only renderers care about it.
    pub cell_size: u32,
}

impl Arena {
    pub fn from_pixels(width: u32, height: u32, cell_size: u32) -> Self {
        Self {
            cols: (width / cell_size) as i32,
            rows: (height / cell_size) as i32,
            cell_size,
        }
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.cols && p.y < self.rows
    }

    pub fn cell_count(&self) -> usize {
        (self.cols.max(0) * self.rows.max(0)) as usize
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::from_pixels(800, 600, 20)
    }
}

pub struct Game {
    arena: Arena,
    snake: VecDeque<Pos>,
    dir: Dir,
    food: Pos,
    alive: bool,
    score: usize,
    rng: SmallRng,
}

impl Game {
    pub fn new(arena: Arena) -> Self {
        Self::with_rng(arena, SmallRng::from_entropy())
    }

    /// Game whose food placements are fully determined by `seed`.
    pub fn with_seed(arena: Arena, seed: u64) -> Self {
        Self::with_rng(arena, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(arena: Arena, rng: SmallRng) -> Self {
        let mut g = Self {
            arena,
            snake: VecDeque::new(),
            dir: Dir::Right,
            food: Pos::new(0, 0),
            alive: true,
            score: 0,
            rng,
        };
        g.reset();
        g
    }

    /// Restore the starting snake in the middle of the arena and place fresh food.
    pub fn reset(&mut self) {
        let start_x = (self.arena.cols / 2).max(INITIAL_LENGTH - 1);
        let start_y = self.arena.rows / 2;
        self.snake.clear();
        for i in 0..INITIAL_LENGTH {
            self.snake.push_back(Pos::new(start_x - i, start_y));
        }
        self.dir = Dir::Right;
        self.alive = true;
        self.score = 0;
        if !self.place_food() {
            self.alive = false;
        }
    }

    /// Start from an arbitrary body, head first. Food is placed off the body.
    ///
    /// `None` for an empty body: a game always has a head.
    pub fn from_body(arena: Arena, body: &[Pos], dir: Dir, seed: u64) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        let mut g = Self::with_seed(arena, seed);
        g.snake = body.iter().copied().collect();
        g.dir = dir;
        g.alive = true;
        if !g.place_food() {
            g.alive = false;
        }
        Some(g)
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    pub fn body(&self) -> &VecDeque<Pos> {
        &self.snake
    }

    pub fn head(&self) -> Pos {
        self.snake[0]
    }

    pub fn dir(&self) -> Dir {
        self.dir
    }

    pub fn food(&self) -> Pos {
        self.food
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn is_terminated(&self) -> bool {
        !self.alive
    }

    pub fn snake_contains(&self, p: Pos) -> bool {
        self.snake.iter().any(|&s| s == p)
    }

    /// Move the food to a uniformly random free cell. False when the arena is full.
    fn place_food(&mut self) -> bool {
        if self.snake.len() >= self.arena.cell_count() {
            return false;
        }
        for _ in 0..FOOD_SAMPLE_ATTEMPTS {
            let p = Pos::new(
                self.rng.gen_range(0..self.arena.cols),
                self.rng.gen_range(0..self.arena.rows),
            );
            if !self.snake_contains(p) {
                self.food = p;
                return true;
            }
        }
        // crowded arena: pick among the free cells directly
        let free: Vec<Pos> = (0..self.arena.rows)
            .flat_map(|y| (0..self.arena.cols).map(move |x| Pos::new(x, y)))
            .filter(|&p| !self.snake_contains(p))
            .collect();
        if free.is_empty() {
            return false;
        }
        self.food = free[self.rng.gen_range(0..free.len())];
        true
    }

    /// Advance one tick. Returns true if food was eaten.
    pub fn tick(&mut self) -> bool {
        if !self.alive {
            return false;
        }

        let new_head = self.head().offset(self.dir.offset());
        if !self.arena.contains(new_head) {
            self.alive = false;
            return false;
        }

        let eating = new_head == self.food;
        if !eating {
            // the tail moves out of the way before the head arrives
            self.snake.pop_back();
        }
        if self.snake_contains(new_head) {
            self.alive = false;
            return false;
        }
        self.snake.push_front(new_head);

        if eating {
            self.score += 1;
            if !self.place_food() {
                log::debug!("arena full at score {}", self.score);
                self.alive = false;
            }
        }
        eating
    }

    /// Human-play steering. A reversal onto the neck is ignored.
    pub fn change_dir(&mut self, new_dir: Dir) {
        if new_dir != self.dir.opposite() {
            self.dir = new_dir;
        }
    }

    /// Steer by the arg-max of a network's outputs (first maximum wins).
    pub fn apply_decision(&mut self, outputs: &[f64]) {
        if outputs.len() != ACTION_COUNT {
            log::debug!(
                "ignoring decision with {} outputs, expected {}",
                outputs.len(),
                ACTION_COUNT
            );
            return;
        }
        if let Some(turn) = Turn::from_index(arg_max(outputs)) {
            self.dir = turn.apply(self.dir);
        }
    }

    /// Wall or body (tail excluded) at `p`.
    pub fn is_danger_at(&self, p: Pos) -> bool {
        if !self.arena.contains(p) {
            return true;
        }
        let len = self.snake.len();
        self.snake
            .iter()
            .skip(1)
            .take(len.saturating_sub(2))
            .any(|&s| s == p)
    }

    fn danger_towards(&self, dir: Dir) -> bool {
        self.is_danger_at(self.head().offset(dir.offset()))
    }

    /// Observation vector, see the module docs for the layout.
    pub fn observe(&self) -> [f64; OBSERVATION_SIZE] {
        let head = self.head();
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            flag(self.danger_towards(self.dir)),
            flag(self.danger_towards(self.dir.turn_right())),
            flag(self.danger_towards(self.dir.turn_left())),
            flag(self.dir == Dir::Left),
            flag(self.dir == Dir::Right),
            flag(self.dir == Dir::Up),
            flag(self.dir == Dir::Down),
            flag(self.food.x < head.x),
            flag(self.food.x > head.x),
            flag(self.food.y < head.y),
            flag(self.food.y > head.y),
        ]
    }
}

fn arg_max(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

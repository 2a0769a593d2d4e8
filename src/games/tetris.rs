//! Falling blocks on a fixed board
//!
//! The board is the level: locked cells block movement and count as walls.
//! The active piece lives in the rules and is drawn as a sprite overlay, so
//! this game spawns no entities at all.

use rand::Rng;

use crate::sim::{
    EntityKind, Grid, IntentSet, LevelProvider, Rules, SimError, Sprite, World,
};

/// The seven tetromino shapes, rows top to bottom
pub const SHAPES: [&[&[u8]]; 7] = [
    &[&[1, 1, 1, 1]],
    &[&[1, 1], &[1, 1]],
    &[&[1, 1, 1], &[0, 1, 0]],
    &[&[1, 1, 1], &[1, 0, 0]],
    &[&[1, 1, 1], &[0, 0, 1]],
    &[&[1, 1, 0], &[0, 1, 1]],
    &[&[0, 1, 1], &[1, 1, 0]],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetrisConfig {
    pub columns: usize,
    pub rows: usize,
    pub cell_size: f32,
    /// Ticks between gravity steps
    pub gravity_ticks: u32,
    pub line_points: u64,
}

impl Default for TetrisConfig {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 20,
            cell_size: 30.0,
            // 500 ms at the 100 ms block step
            gravity_ticks: 5,
            line_points: 100,
        }
    }
}

/// A shape at a board position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    cells: Grid<bool>,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn from_shape(shape: &[&[u8]]) -> Option<Self> {
        let rows = shape
            .iter()
            .map(|row| row.iter().map(|&c| c != 0).collect())
            .collect();
        Some(Self {
            cells: Grid::from_rows(rows)?,
            x: 0,
            y: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.cells.columns()
    }

    pub fn height(&self) -> usize {
        self.cells.rows()
    }

    /// Board coordinates of every filled cell
    pub fn filled(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells
            .iter()
            .filter(|(_, _, on)| **on)
            .map(|(c, r, _)| (self.x + c, self.y + r))
    }

    /// Quarter turn counter-clockwise about the top-left corner
    pub fn rotated(&self) -> Self {
        let (w, h) = (self.width() as i32, self.height() as i32);
        let mut cells = Grid::new(h as usize, w as usize, false);
        for (c, r, &on) in self.cells.iter() {
            cells.set(r, w - 1 - c, on);
        }
        Self {
            cells,
            x: self.x,
            y: self.y,
        }
    }
}

/// Locked cells
#[derive(Debug, Clone)]
pub struct Board {
    cells: Grid<bool>,
    cell_size: f32,
}

impl Board {
    pub fn new(columns: usize, rows: usize, cell_size: f32) -> Self {
        Self {
            cells: Grid::new(columns, rows, false),
            cell_size,
        }
    }

    pub fn columns(&self) -> usize {
        self.cells.columns()
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn is_filled(&self, column: i32, row: i32) -> bool {
        self.cells.get(column, row).copied().unwrap_or(false)
    }

    pub fn set(&mut self, column: i32, row: i32, filled: bool) -> bool {
        self.cells.set(column, row, filled)
    }

    /// Cells above the board are open; sides and floor are not
    fn is_open(&self, column: i32, row: i32) -> bool {
        column >= 0
            && (column as usize) < self.columns()
            && row < self.rows() as i32
            && (row < 0 || !self.is_filled(column, row))
    }

    pub fn fits(&self, piece: &Piece) -> bool {
        piece.filled().all(|(c, r)| self.is_open(c, r))
    }

    pub fn can_move(&self, piece: &Piece, dx: i32, dy: i32) -> bool {
        piece
            .filled()
            .all(|(c, r)| self.is_open(c + dx, r + dy))
    }

    /// Centered at the top. Fails if the spawn position is already blocked.
    pub fn spawn(&self, shape: &[&[u8]]) -> Result<Piece, SimError> {
        let mut piece = Piece::from_shape(shape)
            .ok_or_else(|| SimError::InvalidConfig("ragged piece shape".into()))?;
        piece.x = (self.columns() / 2) as i32 - (piece.width() / 2) as i32;
        piece.y = 0;
        if !self.fits(&piece) {
            return Err(SimError::SpawnBlocked { what: "piece" });
        }
        Ok(piece)
    }

    /// Lock a piece into the board
    pub fn merge(&mut self, piece: &Piece) -> Result<(), SimError> {
        for (c, r) in piece.filled() {
            if !self.cells.set(c, r, true) {
                return Err(SimError::ConsistencyViolation(format!(
                    "piece cell ({c}, {r}) is off the board"
                )));
            }
        }
        Ok(())
    }

    /// Remove full rows, shifting everything above down. Returns rows cleared.
    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = self.rows() as i32 - 1;
        while row >= 0 {
            if self.cells.row_all(row, |&c| c) {
                self.cells.remove_row_shift_down(row, false);
                cleared += 1;
                // Same index now holds the row that was above
            } else {
                row -= 1;
            }
        }
        cleared
    }

    pub fn filled_count(&self) -> usize {
        self.cells.count(|&c| c)
    }
}

impl LevelProvider for Board {
    fn is_walkable(&self, column: i32, row: i32) -> bool {
        self.cells.in_bounds(column, row) && !self.is_filled(column, row)
    }

    fn sprites(&self, out: &mut Vec<Sprite>) {
        out.extend(
            self.cells
                .iter()
                .filter(|(_, _, on)| **on)
                .map(|(c, r, _)| Sprite::cell(EntityKind::Obstacle, c, r, self.cell_size)),
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tetris {
    config: TetrisConfig,
    active: Option<Piece>,
    gravity_counter: u32,
    landed: bool,
}

impl Tetris {
    pub fn new(config: TetrisConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn active(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    fn next_piece(&mut self, world: &mut World<Board>) -> Result<(), SimError> {
        let shape = SHAPES[world.rng.random_range(0..SHAPES.len())];
        self.active = Some(world.level.spawn(shape)?);
        self.gravity_counter = 0;
        Ok(())
    }
}

impl Rules for Tetris {
    type Level = Board;

    fn name(&self) -> &'static str {
        "tetris"
    }

    fn build_level(&self, _seed: u64) -> Result<Board, SimError> {
        let c = &self.config;
        Ok(Board::new(c.columns, c.rows, c.cell_size))
    }

    fn setup(&mut self, world: &mut World<Board>) -> Result<(), SimError> {
        self.next_piece(world)
    }

    fn advance(&mut self, world: &mut World<Board>, intent: &IntentSet) -> Result<(), SimError> {
        let Some(piece) = self.active.as_mut() else {
            return Ok(());
        };
        let board = &world.level;

        let dx = intent.move_x as i32;
        if dx != 0 && board.can_move(piece, dx, 0) {
            piece.x += dx;
        }
        if intent.rotate {
            let rotated = piece.rotated();
            if board.fits(&rotated) {
                *piece = rotated;
            }
        }
        if intent.move_y > 0 && board.can_move(piece, 0, 1) {
            piece.y += 1;
        }

        self.gravity_counter += 1;
        if self.gravity_counter >= self.config.gravity_ticks {
            self.gravity_counter = 0;
            if board.can_move(piece, 0, 1) {
                piece.y += 1;
            } else {
                self.landed = true;
            }
        }
        Ok(())
    }

    fn resolve(&mut self, world: &mut World<Board>) -> Result<(), SimError> {
        if !self.landed {
            return Ok(());
        }
        self.landed = false;
        if let Some(piece) = self.active.take() {
            world.level.merge(&piece)?;
        }
        let lines = world.level.clear_lines();
        if lines > 0 {
            log::debug!("Cleared {lines} lines");
            world.add_score(lines as u64 * self.config.line_points);
        }
        self.next_piece(world)
    }

    fn sprites(&self, _world: &World<Board>, out: &mut Vec<Sprite>) {
        if let Some(piece) = &self.active {
            out.extend(
                piece
                    .filled()
                    .map(|(c, r)| Sprite::cell(EntityKind::Player, c, r, self.config.cell_size)),
            );
        }
    }
}

//! Fixed-size, bounds-checked 2D grid
//!
//! Signed coordinates are accepted everywhere so callers can probe neighbours
//! of edge cells without underflow; anything outside the grid reads as `None`.

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// What a tile is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    #[default]
    Empty,
    Wall,
    Collectible,
}

/// One cell of a tile map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub column: i32,
    pub row: i32,
    pub terrain: TerrainKind,
    /// At most one entity linked to this cell
    pub occupant: Option<EntityId>,
}

/// Row-major grid of `columns * rows` cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    columns: usize,
    rows: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(columns: usize, rows: usize, fill: T) -> Self {
        Self {
            columns,
            rows,
            cells: vec![fill; columns * rows],
        }
    }

    /// Remove `row`, shift everything above it down by one and fill row 0.
    /// Returns false if `row` is out of bounds.
    pub fn remove_row_shift_down(&mut self, row: i32, fill: T) -> bool {
        if row < 0 || row as usize >= self.rows {
            return false;
        }
        let start = row as usize * self.columns;
        self.cells.drain(start..start + self.columns);
        self.cells
            .splice(0..0, std::iter::repeat_n(fill, self.columns));
        true
    }
}

impl<T> Grid<T> {
    /// Build from rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != columns) {
            return None;
        }
        let row_count = rows.len();
        Some(Self {
            columns,
            rows: row_count,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn in_bounds(&self, column: i32, row: i32) -> bool {
        column >= 0 && row >= 0 && (column as usize) < self.columns && (row as usize) < self.rows
    }

    #[inline]
    fn index(&self, column: i32, row: i32) -> Option<usize> {
        self.in_bounds(column, row)
            .then(|| row as usize * self.columns + column as usize)
    }

    pub fn get(&self, column: i32, row: i32) -> Option<&T> {
        self.index(column, row).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, column: i32, row: i32) -> Option<&mut T> {
        self.index(column, row).map(|i| &mut self.cells[i])
    }

    /// Returns false (and writes nothing) when out of bounds
    pub fn set(&mut self, column: i32, row: i32, value: T) -> bool {
        match self.get_mut(column, row) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: i32) -> Option<&[T]> {
        if row < 0 || row as usize >= self.rows {
            return None;
        }
        let start = row as usize * self.columns;
        Some(&self.cells[start..start + self.columns])
    }

    /// True when every cell of `row` matches. False for rows out of bounds.
    pub fn row_all(&self, row: i32, predicate: impl FnMut(&T) -> bool) -> bool {
        self.row(row).is_some_and(|cells| cells.iter().all(predicate))
    }

    /// `(column, row, cell)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &T)> {
        let columns = self.columns.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i % columns) as i32, (i / columns) as i32, cell))
    }

    pub fn count(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.cells.iter().filter(|c| predicate(c)).count()
    }
}

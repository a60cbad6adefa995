//! Grid module - a player's board of committed cells
//!
//! The grid is a fixed 10x20 matrix where each cell is empty or holds the kind
//! of the piece that was committed there. Storage is a flat array for cache
//! locality and cheap copies.
//! Coordinates are (row, col): row 0..19 top to bottom, col 0..9 left to right.

use tetris_rooms_types::{Cell, PieceKind, GRID_HEIGHT, GRID_WIDTH};

use crate::shapes::Shape;
use crate::snapshot::BoardRows;

/// Total number of cells on the grid
const GRID_SIZE: usize = (GRID_WIDTH as usize) * (GRID_HEIGHT as usize);

const WIDTH: usize = GRID_WIDTH as usize;
const HEIGHT: usize = GRID_HEIGHT as usize;

/// A player's grid - 20 rows x 10 columns in row-major order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    cells: [Cell; GRID_SIZE],
}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self {
            cells: [None; GRID_SIZE],
        }
    }

    #[inline(always)]
    fn index(row: i8, col: i8) -> Option<usize> {
        if row < 0 || row >= GRID_HEIGHT as i8 || col < 0 || col >= GRID_WIDTH as i8 {
            return None;
        }
        Some((row as usize) * WIDTH + (col as usize))
    }

    pub fn width(&self) -> u8 {
        GRID_WIDTH
    }

    pub fn height(&self) -> u8 {
        GRID_HEIGHT
    }

    /// Cell at (row, col), or `None` if out of bounds
    pub fn get(&self, row: i8, col: i8) -> Option<Cell> {
        Self::index(row, col).map(|idx| self.cells[idx])
    }

    /// Set the cell at (row, col). Returns false if out of bounds.
    pub fn set(&mut self, row: i8, col: i8, cell: Cell) -> bool {
        match Self::index(row, col) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Whether `shape` placed with its top-left corner at (row, col) hits a
    /// wall, the floor, or a committed cell.
    ///
    /// Sub-cells above the top edge (row < 0) never collide on their own.
    pub fn collides(&self, shape: &Shape, row: i8, col: i8) -> bool {
        shape.cells().any(|(dr, dc)| {
            let r = row as i16 + dr as i16;
            let c = col as i16 + dc as i16;
            if c < 0 || c >= GRID_WIDTH as i16 || r >= GRID_HEIGHT as i16 {
                return true;
            }
            r >= 0 && self.cells[(r as usize) * WIDTH + (c as usize)].is_some()
        })
    }

    /// Write `kind` into every in-bounds occupied sub-cell of `shape`.
    ///
    /// Out-of-bounds sub-cells are skipped. Returns how many cells were written.
    pub fn stamp(&mut self, kind: PieceKind, shape: &Shape, row: i8, col: i8) -> usize {
        let mut written = 0;
        for (dr, dc) in shape.cells() {
            let (Some(r), Some(c)) = (row.checked_add(dr), col.checked_add(dc)) else {
                continue;
            };
            if self.set(r, c, Some(kind)) {
                written += 1;
            }
        }
        written
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, row: usize) -> bool {
        if row >= HEIGHT {
            return false;
        }
        let start = row * WIDTH;
        self.cells[start..start + WIDTH].iter().all(|cell| cell.is_some())
    }

    /// Remove every full row, shifting the rows above down.
    ///
    /// Scans bottom to top; after a clear the same row index is examined
    /// again since the row above has moved into it. Returns the number of
    /// rows removed.
    pub fn clear_full_lines(&mut self) -> u32 {
        let mut cleared = 0;
        let mut row = HEIGHT;
        while row > 0 {
            if self.is_row_full(row - 1) {
                self.collapse_onto(row - 1);
                cleared += 1;
            } else {
                row -= 1;
            }
        }
        cleared
    }

    /// Shift rows 0..row down by one (overwriting `row`) and empty row 0.
    fn collapse_onto(&mut self, row: usize) {
        // copy_within handles the overlapping ranges
        self.cells.copy_within(0..row * WIDTH, WIDTH);
        for cell in &mut self.cells[..WIDTH] {
            *cell = None;
        }
    }

    /// Copy the grid into a row-major 2D array
    pub fn write_rows(&self, out: &mut BoardRows) {
        for (row, chunk) in out.iter_mut().zip(self.cells.chunks_exact(WIDTH)) {
            row.copy_from_slice(chunk);
        }
    }

    /// Number of occupied cells
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Reset every cell to empty
    pub fn clear(&mut self) {
        self.cells = [None; GRID_SIZE];
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

//! Shape catalog - rotation masks for the seven piece kinds
//!
//! A shape is a small boolean matrix (at most 4x4) marking the occupied
//! sub-cells of a piece. Only the spawn orientation is stored; other
//! orientations are computed on demand with [`Shape::rotate_cw`].

use tetris_rooms_types::PieceKind;

/// Largest mask dimension in the catalog (the I piece is 4x4)
pub const MAX_SHAPE_DIM: usize = 4;

/// Immutable rotation mask, stored inline so it can be copied freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: u8,
    cols: u8,
    mask: [[bool; MAX_SHAPE_DIM]; MAX_SHAPE_DIM],
}

const fn mask<const R: usize, const C: usize>(cells: [[u8; C]; R]) -> Shape {
    let mut mask = [[false; MAX_SHAPE_DIM]; MAX_SHAPE_DIM];
    let mut r = 0;
    while r < R {
        let mut c = 0;
        while c < C {
            mask[r][c] = cells[r][c] != 0;
            c += 1;
        }
        r += 1;
    }
    Shape {
        rows: R as u8,
        cols: C as u8,
        mask,
    }
}

const I_SHAPE: Shape = mask([[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]]);
const J_SHAPE: Shape = mask([[1, 0, 0], [1, 1, 1], [0, 0, 0]]);
const L_SHAPE: Shape = mask([[0, 0, 1], [1, 1, 1], [0, 0, 0]]);
const O_SHAPE: Shape = mask([[1, 1], [1, 1]]);
const S_SHAPE: Shape = mask([[0, 1, 1], [1, 1, 0], [0, 0, 0]]);
const T_SHAPE: Shape = mask([[0, 1, 0], [1, 1, 1], [0, 0, 0]]);
const Z_SHAPE: Shape = mask([[1, 1, 0], [0, 1, 1], [0, 0, 0]]);

/// Spawn-orientation shape for a piece kind
pub fn shape_of(kind: PieceKind) -> Shape {
    match kind {
        PieceKind::I => I_SHAPE,
        PieceKind::J => J_SHAPE,
        PieceKind::L => L_SHAPE,
        PieceKind::O => O_SHAPE,
        PieceKind::S => S_SHAPE,
        PieceKind::T => T_SHAPE,
        PieceKind::Z => Z_SHAPE,
    }
}

impl Shape {
    /// Build a shape from row slices.
    ///
    /// Returns `None` for an empty, ragged, or oversized matrix.
    pub fn from_rows(rows: &[&[bool]]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first()?.len();
        if height > MAX_SHAPE_DIM
            || width == 0
            || width > MAX_SHAPE_DIM
            || rows.iter().any(|r| r.len() != width)
        {
            return None;
        }

        let mut mask = [[false; MAX_SHAPE_DIM]; MAX_SHAPE_DIM];
        for (r, row) in rows.iter().enumerate() {
            mask[r][..width].copy_from_slice(row);
        }
        Some(Self {
            rows: height as u8,
            cols: width as u8,
            mask,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows as usize
    }

    pub fn cols(&self) -> usize {
        self.cols as usize
    }

    /// Whether the sub-cell at (r, c) is occupied; out-of-mask is false
    pub fn is_occupied(&self, r: usize, c: usize) -> bool {
        r < self.rows() && c < self.cols() && self.mask[r][c]
    }

    /// Offsets (row, col) of every occupied sub-cell, row-major
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        (0..self.rows()).flat_map(move |r| {
            (0..self.cols())
                .filter(move |&c| self.mask[r][c])
                .map(move |c| (r as i8, c as i8))
        })
    }

    /// 90° clockwise rotation: an R×C mask becomes C×R with
    /// `new[c][R-1-r] = old[r][c]`.
    ///
    /// Purely geometric; callers decide legality against a grid.
    pub fn rotate_cw(&self) -> Self {
        let (rows, cols) = (self.rows(), self.cols());
        let mut mask = [[false; MAX_SHAPE_DIM]; MAX_SHAPE_DIM];
        for r in 0..rows {
            for c in 0..cols {
                mask[c][rows - 1 - r] = self.mask[r][c];
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            mask,
        }
    }
}

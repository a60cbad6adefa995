//! Shared data types and constants for the room server.
//!
//! Everything in this crate is plain data with no dependencies, so it can be
//! used by the simulation core, the registry and the wire protocol alike.
//!
//! # Grid Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9, left to right)
//! - **Height**: 20 rows (indexed 0-19, top to bottom)
//! - **Spawn offset**: row 0, column 3 (top-left corner of the shape mask)
//!
//! # Gravity Speeds
//!
//! | Speed    | Period |
//! |----------|--------|
//! | `Normal` | 800ms  |
//! | `Fast`   | 400ms  |
//! | `Faster` | 200ms  |
//! | `Slide`  | 100ms  |
//!
//! # Examples
//!
//! ```
//! use tetris_rooms_types::{Direction, PieceKind, GRID_HEIGHT, GRID_WIDTH};
//!
//! assert_eq!(PieceKind::T.as_str(), "T");
//! assert_eq!(Direction::from_str("left"), Some(Direction::Left));
//!
//! assert_eq!(GRID_WIDTH, 10);
//! assert_eq!(GRID_HEIGHT, 20);
//! ```

use std::fmt;

/// Grid width in cells (10 columns)
pub const GRID_WIDTH: u8 = 10;

/// Grid height in cells (20 rows)
pub const GRID_HEIGHT: u8 = 20;

/// Row offset where new pieces spawn
pub const SPAWN_ROW: i8 = 0;

/// Column offset where new pieces spawn
pub const SPAWN_COL: i8 = 3;

/// The block queue is topped back up to at least this many entries after
/// every consumption.
pub const QUEUE_MIN_LEN: usize = 5;

/// Number of upcoming pieces exposed in snapshots and the start reply.
pub const PREVIEW_LEN: usize = 3;

/// Points awarded per commit, indexed by lines cleared.
///
/// - 0 lines: 0 points
/// - 1 line: 100 points
/// - 2 lines: 300 points
/// - 3 lines: 500 points
/// - 4 lines: 800 points
///
/// Anything beyond four lines scores nothing.
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// The seven tetromino piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    /// All kinds in catalog order.
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Uppercase letter used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::J => "J",
            PieceKind::L => "L",
            PieceKind::O => "O",
            PieceKind::S => "S",
            PieceKind::T => "T",
            PieceKind::Z => "Z",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell on a player's grid
///
/// - `None`: Empty cell
/// - `Some(PieceKind)`: Cell committed by a piece of that kind
pub type Cell = Option<PieceKind>;

/// Wire name of an empty cell.
pub const EMPTY_CELL: &str = "Empty";

/// Horizontal move direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("left") {
            Some(Direction::Left)
        } else if s.eq_ignore_ascii_case("right") {
            Some(Direction::Right)
        } else {
            None
        }
    }

    /// Column delta for this direction
    pub fn delta(&self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// Commands a player may send to their own session.
///
/// Illegal commands (the result would collide) are silently ignored by the
/// simulation; they are never queued or retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Shift the active piece one column
    Move(Direction),
    /// Rotate the active piece 90° clockwise, in place (no wall kicks)
    Rotate,
    /// Drop the active piece to its lowest legal row and commit it
    HardDrop,
}

/// Gravity tick period presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Speed {
    #[default]
    Normal,
    Fast,
    Faster,
    Slide,
}

impl Speed {
    pub fn as_millis(&self) -> u64 {
        match self {
            Speed::Normal => 800,
            Speed::Fast => 400,
            Speed::Faster => 200,
            Speed::Slide => 100,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Speed::Normal),
            "fast" => Some(Speed::Fast),
            "faster" => Some(Speed::Faster),
            "slide" => Some(Speed::Slide),
            _ => None,
        }
    }
}

/// Identity of a connected player (the transport's connection id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Length of generated room identifiers
pub const ROOM_ID_LEN: usize = 6;

/// Characters room identifiers are drawn from
pub const ROOM_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Identifier of a registered room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the value has the shape of a generated id
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ROOM_ID_LEN && self.0.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

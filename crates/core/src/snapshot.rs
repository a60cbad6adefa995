//! Read-only views of room state for broadcast.
//!
//! Snapshots own their data; producing one never mutates the room.

use arrayvec::ArrayVec;

use crate::session::SessionState;
use tetris_rooms_types::{Cell, PieceKind, PlayerId, RoomId, GRID_HEIGHT, GRID_WIDTH, PREVIEW_LEN};

/// A grid rendered as rows of cells
pub type BoardRows = [[Cell; GRID_WIDTH as usize]; GRID_HEIGHT as usize];

/// One player's rendered board and counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub lines: u32,
    /// Pieces committed this game
    pub pieces: u32,
    pub ready: bool,
    pub state: SessionState,
    /// Committed cells with the active piece overlaid
    pub board: BoardRows,
}

/// Whole-room view sent to members after every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub is_playing: bool,
    pub next_blocks: ArrayVec<PieceKind, PREVIEW_LEN>,
    /// Ordered by player id
    pub players: Vec<PlayerSnapshot>,
}

impl RoomSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// Entry of the room listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub owner_id: PlayerId,
    pub member_ids: Vec<PlayerId>,
    pub is_playing: bool,
}

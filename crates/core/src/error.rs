//! Error taxonomy for room operations
//!
//! Illegal moves are not errors; the engine reports them as `Ok(false)`.

use tetris_rooms_types::{PlayerId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("player {0} is already a member")]
    AlreadyMember(PlayerId),

    /// A programming defect was detected; the operation was rejected
    /// before any state changed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl RoomError {
    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) | RoomError::PlayerNotFound(_) => "not_found",
            RoomError::AlreadyMember(_) => "already_member",
            RoomError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

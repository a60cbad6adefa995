//! Player session - one player's board, active piece and score
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Falling --blocked below--> Locking --commit--> Falling
//!                    ^                                    |
//!                    +------------------------------------+
//!                                        commit, spawn blocked --> GameOver
//! any --reset--> Idle
//! ```
//!
//! `Locking` is a one-tick grace state: the tick that finds the piece resting
//! on something only marks it, the next tick commits it. Moves and rotations
//! are accepted only while `Falling`; illegal ones are silently ignored.

use tracing::{info, warn};

use crate::error::RoomError;
use crate::grid::Grid;
use crate::queue::BlockQueue;
use crate::scoring::calculate_score;
use crate::shapes::{shape_of, Shape};
use crate::snapshot::{BoardRows, PlayerSnapshot};
use tetris_rooms_types::{
    Direction, GameAction, PieceKind, PlayerId, GRID_HEIGHT, GRID_WIDTH, SPAWN_COL, SPAWN_ROW,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Joined, no game in progress
    Idle,
    /// Active piece is falling
    Falling,
    /// Active piece is resting and will be committed on the next tick
    Locking,
    /// Spawn was blocked; terminal until reset
    GameOver,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Falling => "falling",
            SessionState::Locking => "locking",
            SessionState::GameOver => "gameOver",
        }
    }

    /// Whether the session takes part in gravity ticks
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Falling | SessionState::Locking)
    }
}

/// The falling piece and its grid offset (top-left of the shape mask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub row: i8,
    pub col: i8,
}

impl ActivePiece {
    /// A fresh piece in spawn orientation at the spawn offset
    pub fn spawn(kind: PieceKind) -> Self {
        Self {
            kind,
            shape: shape_of(kind),
            row: SPAWN_ROW,
            col: SPAWN_COL,
        }
    }

    fn shifted(self, drow: i8, dcol: i8) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
            ..self
        }
    }
}

/// What a commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    pub kind: PieceKind,
    /// Row offset the piece was committed at
    pub row: i8,
    pub col: i8,
    pub lines_cleared: u32,
    pub points: u32,
    /// The following piece could not spawn
    pub game_over: bool,
}

/// Result of one gravity tick for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session not in play
    Skipped,
    /// Piece moved down one row
    Fell,
    /// Piece is resting; it commits on the next tick
    Locked,
    Committed(CommitReport),
}

#[derive(Debug, Clone)]
pub struct PlayerSession {
    id: PlayerId,
    name: String,
    grid: Grid,
    active: Option<ActivePiece>,
    state: SessionState,
    score: u32,
    lines: u32,
    pieces: u32,
    ready: bool,
}

impl PlayerSession {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            grid: Grid::new(),
            active: None,
            state: SessionState::Idle,
            score: 0,
            lines: 0,
            pieces: 0,
            ready: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Total lines cleared this game
    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Pieces committed this game
    pub fn pieces(&self) -> u32 {
        self.pieces
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Direct grid access for setting up positions in tests
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Replace the active piece (tests and scripted setups)
    pub fn set_active(&mut self, piece: ActivePiece) {
        self.active = Some(piece);
    }

    /// Back to Idle with an empty grid and zeroed counters
    pub fn reset(&mut self) {
        self.grid.clear();
        self.active = None;
        self.state = SessionState::Idle;
        self.score = 0;
        self.lines = 0;
        self.pieces = 0;
    }

    /// Begin a new game: reset, then spawn the first piece from `queue`.
    ///
    /// Returns false if the spawn was blocked (only possible with a
    /// pre-filled grid).
    pub fn start(&mut self, queue: &mut BlockQueue) -> bool {
        self.reset();
        self.spawn(queue)
    }

    fn spawn(&mut self, queue: &mut BlockQueue) -> bool {
        let piece = ActivePiece::spawn(queue.pop());
        if self.grid.collides(&piece.shape, piece.row, piece.col) {
            self.active = None;
            self.state = SessionState::GameOver;
            info!(player = %self.id, kind = %piece.kind, "spawn blocked, game over");
            return false;
        }
        self.active = Some(piece);
        self.state = SessionState::Falling;
        true
    }

    /// Apply one gravity tick
    pub fn gravity(&mut self, queue: &mut BlockQueue) -> Result<TickOutcome, RoomError> {
        match self.state {
            SessionState::Idle | SessionState::GameOver => Ok(TickOutcome::Skipped),
            SessionState::Falling => {
                let piece = self.require_active()?;
                if self.grid.collides(&piece.shape, piece.row + 1, piece.col) {
                    self.state = SessionState::Locking;
                    Ok(TickOutcome::Locked)
                } else {
                    self.active = Some(piece.shifted(1, 0));
                    Ok(TickOutcome::Fell)
                }
            }
            SessionState::Locking => self.commit(queue).map(TickOutcome::Committed),
        }
    }

    /// Run a player command.
    ///
    /// Returns `Ok(true)` if the state changed, `Ok(false)` if the command
    /// was illegal or the session is not accepting it.
    pub fn apply(&mut self, action: GameAction, queue: &mut BlockQueue) -> Result<bool, RoomError> {
        match action {
            GameAction::Move(direction) => Ok(self.try_move(direction)),
            GameAction::Rotate => Ok(self.try_rotate()),
            GameAction::HardDrop => Ok(self.hard_drop(queue)?.is_some()),
        }
    }

    /// Shift one column if the result does not collide
    pub fn try_move(&mut self, direction: Direction) -> bool {
        if self.state != SessionState::Falling {
            return false;
        }
        let Some(piece) = self.active else {
            return false;
        };
        let moved = piece.shifted(0, direction.delta());
        if self.grid.collides(&moved.shape, moved.row, moved.col) {
            return false;
        }
        self.active = Some(moved);
        true
    }

    /// Rotate clockwise in place if the rotated mask does not collide
    pub fn try_rotate(&mut self) -> bool {
        if self.state != SessionState::Falling {
            return false;
        }
        let Some(piece) = self.active else {
            return false;
        };
        let shape = piece.shape.rotate_cw();
        if self.grid.collides(&shape, piece.row, piece.col) {
            return false;
        }
        self.active = Some(ActivePiece { shape, ..piece });
        true
    }

    /// Drop to the lowest legal row and commit immediately.
    ///
    /// Accepted while Falling or Locking. The search is bounded by the grid
    /// height.
    pub fn hard_drop(&mut self, queue: &mut BlockQueue) -> Result<Option<CommitReport>, RoomError> {
        if !self.state.is_active() {
            return Ok(None);
        }
        let piece = self.require_active()?;

        let mut row = piece.row;
        for _ in 0..GRID_HEIGHT {
            if self.grid.collides(&piece.shape, row + 1, piece.col) {
                break;
            }
            row += 1;
        }
        self.active = Some(ActivePiece { row, ..piece });
        self.state = SessionState::Locking;
        self.commit(queue).map(Some)
    }

    /// Stamp the active piece, clear lines, score, and spawn the next piece.
    ///
    /// Fails without touching any state if there is no active piece or it
    /// overlaps committed cells.
    pub fn commit(&mut self, queue: &mut BlockQueue) -> Result<CommitReport, RoomError> {
        let piece = self.require_active()?;
        if self.grid.collides(&piece.shape, piece.row, piece.col) {
            let err = RoomError::InvariantViolation(format!(
                "player {} commit of {} at ({}, {}) overlaps the grid",
                self.id, piece.kind, piece.row, piece.col
            ));
            warn!(player = %self.id, error = %err, "commit rejected");
            return Err(err);
        }

        self.grid.stamp(piece.kind, &piece.shape, piece.row, piece.col);
        let lines_cleared = self.grid.clear_full_lines();
        let points = calculate_score(lines_cleared);
        self.score = self.score.saturating_add(points);
        self.lines = self.lines.saturating_add(lines_cleared);
        self.pieces = self.pieces.saturating_add(1);

        let game_over = !self.spawn(queue);

        Ok(CommitReport {
            kind: piece.kind,
            row: piece.row,
            col: piece.col,
            lines_cleared,
            points,
            game_over,
        })
    }

    fn require_active(&self) -> Result<ActivePiece, RoomError> {
        self.active.ok_or_else(|| {
            let err = RoomError::InvariantViolation(format!(
                "player {} is {} without an active piece",
                self.id,
                self.state.as_str()
            ));
            warn!(player = %self.id, error = %err, "operation rejected");
            err
        })
    }

    /// Copy of the grid with the active piece overlaid; the stored grid is
    /// left untouched.
    pub fn rendered_grid(&self) -> Grid {
        let mut grid = self.grid.clone();
        if let Some(piece) = self.active {
            if self.state.is_active() {
                grid.stamp(piece.kind, &piece.shape, piece.row, piece.col);
            }
        }
        grid
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let mut board: BoardRows = [[None; GRID_WIDTH as usize]; GRID_HEIGHT as usize];
        self.rendered_grid().write_rows(&mut board);
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            score: self.score,
            lines: self.lines,
            pieces: self.pieces,
            ready: self.ready,
            state: self.state,
            board,
        }
    }
}

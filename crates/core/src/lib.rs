//! Room simulation core - pure, deterministic, and testable
//!
//! This crate holds every game rule of the room server. It has **no**
//! dependencies on timers, sockets or async runtimes:
//!
//! - **Deterministic**: piece sources are injected and seedable
//! - **Serial**: every mutation takes `&mut self`; the owner of a [`Room`]
//!   decides how concurrent callers are ordered
//! - **All-or-nothing**: invariant violations are reported before any state
//!   is written
//!
//! # Module Structure
//!
//! - [`shapes`]: the seven rotation masks and clockwise rotation
//! - [`grid`]: 10x20 board with collision, stamping and line clearing
//! - [`rng`]: LCG plus uniform, 7-bag and scripted piece sources
//! - [`queue`]: the room-wide FIFO of upcoming pieces
//! - [`scoring`]: fixed points per commit
//! - [`session`]: one player's state machine (Idle, Falling, Locking, GameOver)
//! - [`room`]: sessions sharing a queue, tick and command dispatch
//! - [`snapshot`]: read-only views for broadcast
//! - [`error`]: [`RoomError`]
//!
//! # Example
//!
//! ```
//! use tetris_rooms_core::{BlockQueue, Room, ScriptedSource};
//! use tetris_rooms_types::{GameAction, PieceKind, PlayerId, RoomId};
//!
//! let queue = BlockQueue::new(Box::new(ScriptedSource::new([PieceKind::O])));
//! let mut room = Room::new(RoomId::from("abc123"), "lobby", PlayerId(1), "alice", queue);
//!
//! room.start(PlayerId(1)).unwrap();
//! room.tick();
//! room.apply(PlayerId(1), GameAction::HardDrop).unwrap();
//!
//! let snapshot = room.snapshot();
//! assert!(snapshot.is_playing);
//! assert_eq!(snapshot.players[0].score, 0);
//! ```

pub mod error;
pub mod grid;
pub mod queue;
pub mod rng;
pub mod room;
pub mod scoring;
pub mod session;
pub mod shapes;
pub mod snapshot;

pub use tetris_rooms_types as types;

pub use error::RoomError;
pub use grid::Grid;
pub use queue::BlockQueue;
pub use rng::{BagSource, PieceSource, Randomizer, ScriptedSource, SimpleRng, UniformSource};
pub use room::{Room, TickReport};
pub use scoring::calculate_score;
pub use session::{ActivePiece, CommitReport, PlayerSession, SessionState, TickOutcome};
pub use shapes::{shape_of, Shape};
pub use snapshot::{BoardRows, PlayerSnapshot, RoomSnapshot, RoomSummary};

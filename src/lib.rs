//! Tetris rooms (workspace facade crate).
//!
//! Exposes `tetris_rooms::{types,core,server}` while the implementation lives
//! in dedicated crates under `crates/`.

pub use tetris_rooms_core as core;
pub use tetris_rooms_server as server;
pub use tetris_rooms_types as types;

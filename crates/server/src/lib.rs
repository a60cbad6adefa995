//! Async side of the room server.
//!
//! - [`registry`]: the table of live rooms, one lock per room
//! - [`ticker`]: per-room gravity driver, released with the room
//! - [`protocol`]: line-delimited JSON messages
//! - [`outbound`]: routing of server messages to client writer tasks
//! - [`server`]: TCP listener, per-client reader/writer tasks, env config

pub mod outbound;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod ticker;

pub use outbound::OutboundMessage;
pub use registry::{RoomRegistry, RoomSettings};
pub use server::{run_server, ServerConfig, PROTOCOL_VERSION};

//! Outbound routing between room logic and connected clients.
//!
//! Rooms and the registry never touch sockets. They push
//! [`OutboundMessage`]s into an unbounded channel; the server's dispatcher
//! task fans each one out to the matching client writer tasks.

use tokio::sync::mpsc;
use tracing::error;

use crate::protocol::ServerMessage;
use tetris_rooms_types::PlayerId;

/// Message to be delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// One line to each listed client
    ToClients { client_ids: Vec<PlayerId>, line: String },
    /// One line to every connected client
    Broadcast { line: String },
}

pub type OutboundSender = mpsc::UnboundedSender<OutboundMessage>;

/// Serialize `msg` and queue it for `client_ids`.
///
/// A closed channel means the server is shutting down; the message is dropped.
pub fn send_to(tx: &OutboundSender, client_ids: Vec<PlayerId>, msg: &ServerMessage) {
    if client_ids.is_empty() {
        return;
    }
    match msg.to_line() {
        Ok(line) => {
            let _ = tx.send(OutboundMessage::ToClients { client_ids, line });
        }
        Err(e) => error!(error = %e, "failed to encode outbound message"),
    }
}

/// Serialize `msg` and queue it for every connected client.
pub fn broadcast(tx: &OutboundSender, msg: &ServerMessage) {
    match msg.to_line() {
        Ok(line) => {
            let _ = tx.send(OutboundMessage::Broadcast { line });
        }
        Err(e) => error!(error = %e, "failed to encode outbound message"),
    }
}

//! TCP server for room clients
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::outbound::OutboundMessage;
use crate::protocol::*;
use crate::registry::{RoomRegistry, RoomSettings};
use tetris_rooms_core::{Randomizer, RoomError};
use tetris_rooms_types::{GameAction, PlayerId, RoomId, Speed};

pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub tick_period: Duration,
    pub randomizer: Randomizer,
    pub seed: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            protocol_version: PROTOCOL_VERSION.to_string(),
            tick_period: Duration::from_millis(Speed::Normal.as_millis()),
            randomizer: Randomizer::Uniform,
            seed: time_seed(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables; unset or invalid values fall back
    /// to the defaults.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("TETRIS_ROOMS_HOST").unwrap_or(defaults.host);
        let port = env::var("TETRIS_ROOMS_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let speed = env::var("TETRIS_ROOMS_SPEED")
            .ok()
            .and_then(|s| Speed::from_str(s.trim()))
            .unwrap_or_default();
        let tick_ms = env::var("TETRIS_ROOMS_TICK_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or_else(|| speed.as_millis());

        let randomizer = env::var("TETRIS_ROOMS_RANDOMIZER")
            .ok()
            .and_then(|s| Randomizer::from_str(s.trim()))
            .unwrap_or_default();

        let seed = env::var("TETRIS_ROOMS_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.seed);

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            tick_period: Duration::from_millis(tick_ms),
            randomizer,
            seed,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            tick_period: self.tick_period,
            randomizer: self.randomizer,
            seed: self.seed,
        }
    }
}

fn time_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    registry: Arc<RoomRegistry>,
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: PlayerId,
    pub addr: SocketAddr,
    /// Channel to this client's writer task
    pub tx: mpsc::UnboundedSender<String>,
}

/// Per-connection session state kept by the reader loop
struct Connection {
    id: PlayerId,
    name: String,
    room: Option<RoomId>,
    tx: mpsc::UnboundedSender<String>,
}

impl Connection {
    fn reply(&self, msg: &ServerMessage) {
        match msg.to_line() {
            Ok(line) => {
                let _ = self.tx.send(line);
            }
            Err(e) => warn!(client = %self.id, error = %e, "failed to encode reply"),
        }
    }

    fn reply_error(&self, seq: u64, code: ErrorCode, message: &str) {
        self.reply(&create_error(seq, code, message));
    }

    fn reply_room_error(&self, seq: u64, err: &RoomError) {
        self.reply(&create_room_error(seq, err));
    }
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "room server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let registry = Arc::new(RoomRegistry::new(config.room_settings(), out_tx));
    let state = Arc::new(ServerState {
        config,
        clients: RwLock::new(Vec::new()),
        registry,
    });
    let mut client_id_counter = 0u64;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                match msg {
                    OutboundMessage::ToClients { client_ids, line } => {
                        for c in clients.iter().filter(|c| client_ids.contains(&c.id)) {
                            let _ = c.tx.send(line.clone());
                        }
                    }
                    OutboundMessage::Broadcast { line } => {
                        for c in clients.iter() {
                            let _ = c.tx.send(line.clone());
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = PlayerId(client_id_counter);

        info!(client = %client_id, %addr, "client connected");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, state).await {
                warn!(client = %client_id, error = %e, "client error");
            }
            info!(client = %client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: PlayerId,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            addr,
            tx: tx.clone(),
        });
    }

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut conn = Connection {
        id: client_id,
        name: format!("player-{client_id}"),
        room: None,
        tx,
    };

    // Handle incoming messages
    let mut line = String::new();
    let result = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(anyhow::Error::from(e)),
        };
        if bytes_read == 0 {
            // Client disconnected
            break Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Request { seq, request }) => {
                handle_request(&state, &mut conn, seq, request).await;
            }
            Ok(ParsedMessage::Unknown { seq, msg_type }) => {
                debug!(client = %client_id, %msg_type, "unknown message type");
                conn.reply_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("Unknown message type: {msg_type}"),
                );
            }
            Err(e) => {
                debug!(client = %client_id, error = %e, "parse failure");
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                conn.reply_error(seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {e}"));
            }
        }
    };

    // Clean up: leave the current room and drop the client handle.
    if leave_current_room(&state, &mut conn).await {
        state.registry.broadcast_rooms_list().await;
    }
    {
        let mut clients = state.clients.write().await;
        if let Some(pos) = clients.iter().position(|c| c.id == client_id) {
            let handle = clients.swap_remove(pos);
            debug!(client = %handle.id, addr = %handle.addr, "client handle released");
        }
    }

    // Cancel write task
    drop(conn);
    let _ = write_task.await;

    result
}

/// Leave the connection's room, if any. Returns true if it was in one.
async fn leave_current_room(state: &ServerState, conn: &mut Connection) -> bool {
    let Some(room_id) = conn.room.take() else {
        return false;
    };
    if let Err(e) = state.registry.leave(&room_id, conn.id).await {
        // The room can only disappear underneath us through our own leave.
        debug!(client = %conn.id, room = %room_id, error = %e, "leave on stale room");
    }
    true
}

async fn handle_request(state: &ServerState, conn: &mut Connection, seq: u64, request: Request) {
    let registry = &state.registry;
    match request {
        Request::Hello { name } => {
            if let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
                conn.name = name;
                if let Some(room_id) = conn.room.clone() {
                    if let Err(e) = registry.rename(&room_id, conn.id, &conn.name).await {
                        debug!(client = %conn.id, room = %room_id, error = %e, "rename on stale room");
                    }
                }
            }
            conn.reply(&create_welcome(conn.id, &conn.name, &state.config.protocol_version));
        }

        Request::CreateRoom { name } => {
            leave_current_room(state, conn).await;
            let room_id = registry.create(conn.id, &conn.name, &name).await;
            conn.room = Some(room_id);
            registry.broadcast_rooms_list().await;
        }

        Request::JoinRoom { room_id } => {
            let room_id = RoomId::new(room_id);
            if conn.room.as_ref() == Some(&room_id) {
                conn.reply_room_error(seq, &RoomError::AlreadyMember(conn.id));
                return;
            }
            if !registry.contains(&room_id).await {
                conn.reply_room_error(seq, &RoomError::RoomNotFound(room_id));
                return;
            }
            leave_current_room(state, conn).await;
            match registry.join(&room_id, conn.id, &conn.name).await {
                Ok(()) => conn.room = Some(room_id),
                Err(e) => conn.reply_room_error(seq, &e),
            }
            registry.broadcast_rooms_list().await;
        }

        Request::LeaveRoom { room_id } => {
            let matches = match (&conn.room, room_id) {
                (Some(current), Some(requested)) => current.as_str() == requested,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !matches {
                conn.reply_error(seq, ErrorCode::NotInRoom, "Not a member of that room");
                return;
            }
            leave_current_room(state, conn).await;
            registry.broadcast_rooms_list().await;
        }

        Request::GetRooms => {
            let rooms = registry.rooms_list().await;
            conn.reply(&create_rooms_list(&rooms));
        }

        Request::StartGame => {
            let Some(room_id) = conn.room.clone() else {
                conn.reply_error(seq, ErrorCode::NotInRoom, "Join a room before starting");
                return;
            };
            match registry.start_game(&room_id, conn.id).await {
                Ok(_) => registry.broadcast_rooms_list().await,
                Err(e) => conn.reply_room_error(seq, &e),
            }
        }

        Request::ResetGame => {
            let Some(room_id) = conn.room.clone() else {
                conn.reply_error(seq, ErrorCode::NotInRoom, "Join a room before resetting");
                return;
            };
            match registry.reset_game(&room_id, conn.id).await {
                Ok(()) => registry.broadcast_rooms_list().await,
                Err(e) => conn.reply_room_error(seq, &e),
            }
        }

        Request::SetReady { ready } => {
            let Some(room_id) = conn.room.clone() else {
                conn.reply_error(seq, ErrorCode::NotInRoom, "Join a room first");
                return;
            };
            if let Err(e) = registry.set_ready(&room_id, conn.id, ready).await {
                conn.reply_room_error(seq, &e);
            }
        }

        Request::MovePiece { direction } => {
            run_action(state, conn, seq, GameAction::Move(direction.0)).await;
        }
        Request::RotatePiece => run_action(state, conn, seq, GameAction::Rotate).await,
        Request::DropPiece => run_action(state, conn, seq, GameAction::HardDrop).await,
    }
}

/// Forward a game command to the connection's room. Ignored commands get no
/// reply.
async fn run_action(state: &ServerState, conn: &Connection, seq: u64, action: GameAction) {
    let Some(room_id) = conn.room.as_ref() else {
        conn.reply_error(seq, ErrorCode::NotInRoom, "Join a room before sending commands");
        return;
    };
    match state.registry.command(room_id, conn.id, action).await {
        Ok(_) => {}
        Err(e) => conn.reply_room_error(seq, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.protocol_version, "1.0.0");
        assert_eq!(config.tick_period, Duration::from_millis(800));
        assert_eq!(config.randomizer, Randomizer::Uniform);
        assert_eq!(config.socket_addr().unwrap().port(), 3001);
    }

    #[test]
    fn test_server_config_from_env() {
        // This test just ensures it doesn't panic
        let _config = ServerConfig::from_env();
    }

    #[test]
    fn test_bad_host_is_an_error() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}

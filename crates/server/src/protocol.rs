//! Protocol module - JSON message types for the room server
//!
//! Line-delimited JSON: every message is one object with a `type` tag.
//! Inbound messages may carry a `seq` number that is echoed back in errors.

use std::fmt;

use arrayvec::ArrayVec;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use tetris_rooms_core::{BoardRows, PlayerSnapshot, RoomError, RoomSnapshot, RoomSummary};
use tetris_rooms_types::{Direction, PieceKind, PlayerId, RoomId, EMPTY_CELL, PREVIEW_LEN};

// ============== Client -> Server Messages ==============

/// Every inbound `type` tag the server understands
pub const REQUEST_TYPES: [&str; 11] = [
    "hello",
    "createRoom",
    "joinRoom",
    "leaveRoom",
    "getRooms",
    "startGame",
    "movePiece",
    "rotatePiece",
    "dropPiece",
    "resetGame",
    "setReady",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectionName(pub Direction);

impl<'de> Deserialize<'de> for DirectionName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Direction::from_str(&s)
            .map(DirectionName)
            .ok_or_else(|| serde::de::Error::custom("direction must be \"left\" or \"right\""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "hello")]
    Hello {
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "createRoom")]
    CreateRoom {
        #[serde(default)]
        name: String,
    },
    #[serde(rename = "joinRoom")]
    JoinRoom {
        #[serde(alias = "roomId")]
        room_id: String,
    },
    #[serde(rename = "leaveRoom")]
    LeaveRoom {
        #[serde(default, alias = "roomId")]
        room_id: Option<String>,
    },
    #[serde(rename = "getRooms")]
    GetRooms,
    #[serde(rename = "startGame")]
    StartGame,
    #[serde(rename = "movePiece")]
    MovePiece { direction: DirectionName },
    #[serde(rename = "rotatePiece")]
    RotatePiece,
    #[serde(rename = "dropPiece")]
    DropPiece,
    #[serde(rename = "resetGame")]
    ResetGame,
    #[serde(rename = "setReady")]
    SetReady { ready: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Request { seq: u64, request: Request },
    /// Well-formed JSON with a `type` this server does not handle
    Unknown { seq: u64, msg_type: String },
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "type", default)]
    msg_type: Option<String>,
    #[serde(default)]
    seq: Option<u64>,
}

pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    let header = serde_json::from_str::<Header>(json)?;
    let seq = header.seq.unwrap_or(0);
    let msg_type = header.msg_type.unwrap_or_else(|| "unknown".to_string());
    if !REQUEST_TYPES.contains(&msg_type.as_str()) {
        return Ok(ParsedMessage::Unknown { seq, msg_type });
    }
    let request = serde_json::from_str::<Request>(json)?;
    Ok(ParsedMessage::Request { seq, request })
}

/// Best-effort `seq` recovery from a line that failed to parse
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMessage),
    #[serde(rename = "roomsList")]
    RoomsList(RoomsListMessage),
    #[serde(rename = "gameStarted")]
    GameStarted(GameStartedMessage),
    #[serde(rename = "gameState")]
    GameState(GameStateMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl ServerMessage {
    /// Serialize to a single JSON line (without the trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WelcomeMessage {
    pub client_id: u64,
    pub name: String,
    pub protocol_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomsListMessage {
    pub rooms: Vec<RoomEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomEntry {
    pub id: String,
    pub name: String,
    pub owner_id: u64,
    pub member_ids: Vec<u64>,
    pub is_playing: bool,
}

impl From<&RoomSummary> for RoomEntry {
    fn from(summary: &RoomSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            name: summary.name.clone(),
            owner_id: summary.owner_id.0,
            member_ids: summary.member_ids.iter().map(|id| id.0).collect(),
            is_playing: summary.is_playing,
        }
    }
}

/// Upcoming pieces as letters, head first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextBlocks(pub ArrayVec<PieceKind, PREVIEW_LEN>);

impl Serialize for NextBlocks {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for kind in &self.0 {
            seq.serialize_element(kind.as_str())?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStartedMessage {
    pub room_id: String,
    pub next_blocks: NextBlocks,
}

/// A rendered board: rows of `"Empty"` or piece letters
#[derive(Clone, PartialEq, Eq)]
pub struct WireBoard(pub BoardRows);

impl fmt::Debug for WireBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = self.0.iter().flatten().filter(|c| c.is_some()).count();
        f.debug_struct("WireBoard").field("filled", &filled).finish()
    }
}

struct WireRow<'a>(&'a [Option<PieceKind>]);

impl Serialize for WireRow<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for cell in self.0 {
            seq.serialize_element(cell.map_or(EMPTY_CELL, |kind| kind.as_str()))?;
        }
        seq.end()
    }
}

impl Serialize for WireBoard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for row in &self.0 {
            seq.serialize_element(&WireRow(row))?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    pub id: u64,
    pub name: String,
    pub score: u32,
    pub lines: u32,
    pub pieces: u32,
    pub ready: bool,
    pub state: &'static str,
    pub board: WireBoard,
}

impl From<&PlayerSnapshot> for PlayerEntry {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.id.0,
            name: player.name.clone(),
            score: player.score,
            lines: player.lines,
            pieces: player.pieces,
            ready: player.ready,
            state: player.state.as_str(),
            board: WireBoard(player.board),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStateMessage {
    pub room_id: String,
    pub is_playing: bool,
    pub next_blocks: NextBlocks,
    pub players: Vec<PlayerEntry>,
}

impl From<&RoomSnapshot> for GameStateMessage {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            room_id: snapshot.room_id.to_string(),
            is_playing: snapshot.is_playing,
            next_blocks: NextBlocks(snapshot.next_blocks.clone()),
            players: snapshot.players.iter().map(PlayerEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "already_member")]
    AlreadyMember,
    #[serde(rename = "invariant_violation")]
    InvariantViolation,
    #[serde(rename = "not_in_room")]
    NotInRoom,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
}

impl From<&RoomError> for ErrorCode {
    fn from(err: &RoomError) -> Self {
        match err {
            RoomError::RoomNotFound(_) | RoomError::PlayerNotFound(_) => ErrorCode::NotFound,
            RoomError::AlreadyMember(_) => ErrorCode::AlreadyMember,
            RoomError::InvariantViolation(_) => ErrorCode::InvariantViolation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub seq: u64,
    pub code: ErrorCode,
    pub message: String,
}

pub fn create_welcome(client_id: PlayerId, name: &str, protocol_version: &str) -> ServerMessage {
    ServerMessage::Welcome(WelcomeMessage {
        client_id: client_id.0,
        name: name.to_string(),
        protocol_version: protocol_version.to_string(),
    })
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error(ErrorMessage {
        seq,
        code,
        message: message.to_string(),
    })
}

pub fn create_room_error(seq: u64, err: &RoomError) -> ServerMessage {
    create_error(seq, ErrorCode::from(err), &err.to_string())
}

pub fn create_rooms_list(rooms: &[RoomSummary]) -> ServerMessage {
    ServerMessage::RoomsList(RoomsListMessage {
        rooms: rooms.iter().map(RoomEntry::from).collect(),
    })
}

pub fn create_game_started(
    room_id: &RoomId,
    next_blocks: ArrayVec<PieceKind, PREVIEW_LEN>,
) -> ServerMessage {
    ServerMessage::GameStarted(GameStartedMessage {
        room_id: room_id.to_string(),
        next_blocks: NextBlocks(next_blocks),
    })
}

pub fn create_game_state(snapshot: &RoomSnapshot) -> ServerMessage {
    ServerMessage::GameState(GameStateMessage::from(snapshot))
}

//! Room registry - the process-wide table of live rooms
//!
//! Locking discipline:
//!
//! - the table itself sits behind one `RwLock`, held only long enough to look
//!   up, insert or remove an `Arc<RoomHandle>`
//! - each room has its own `Mutex`; ticks, commands, joins and leaves on that
//!   room run one at a time in lock order
//! - the table lock is never held while waiting on a room lock
//!
//! A room whose last member leaves is marked closed, its tick driver is
//! dropped, and its entry is removed. Every later operation on it reports
//! `RoomNotFound`, so repeating a teardown is harmless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arrayvec::ArrayVec;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::outbound::{broadcast, send_to, OutboundSender};
use crate::protocol::{create_game_started, create_game_state, create_rooms_list};
use crate::ticker::TickDriver;
use tetris_rooms_core::{
    BlockQueue, Randomizer, Room, RoomError, RoomSnapshot, RoomSummary, SimpleRng,
};
use tetris_rooms_types::{GameAction, PieceKind, PlayerId, RoomId, PREVIEW_LEN, ROOM_ID_ALPHABET, ROOM_ID_LEN};

/// Shortest gravity period a tick driver will run at
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// How new rooms are configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    pub tick_period: Duration,
    pub randomizer: Randomizer,
    /// Base seed; each room derives its own from it
    pub seed: u32,
}

/// A registered room and its tick driver
pub struct RoomHandle {
    pub id: RoomId,
    pub(crate) slot: Mutex<RoomSlot>,
}

pub(crate) struct RoomSlot {
    pub(crate) room: Room,
    pub(crate) ticker: Option<TickDriver>,
    /// Set once the room has emptied; the entry is about to disappear
    pub(crate) closed: bool,
}

impl RoomSlot {
    /// Drop the tick driver if the room is no longer running.
    ///
    /// Returns true if a driver was released.
    fn release_idle_ticker(&mut self) -> bool {
        if !self.room.is_running() {
            return self.ticker.take().is_some();
        }
        false
    }
}

struct RoomTable {
    rooms: HashMap<RoomId, Arc<RoomHandle>>,
    rng: SimpleRng,
}

impl RoomTable {
    fn generate_id(&mut self) -> RoomId {
        loop {
            let id: String = (0..ROOM_ID_LEN)
                .map(|_| {
                    let idx = self.rng.next_range(ROOM_ID_ALPHABET.len() as u32) as usize;
                    ROOM_ID_ALPHABET[idx] as char
                })
                .collect();
            let id = RoomId::new(id);
            if !self.rooms.contains_key(&id) {
                return id;
            }
            debug!(room = %id, "room id collision, regenerating");
        }
    }
}

pub struct RoomRegistry {
    table: RwLock<RoomTable>,
    settings: RoomSettings,
    outbound: OutboundSender,
}

impl RoomRegistry {
    pub fn new(mut settings: RoomSettings, outbound: OutboundSender) -> Self {
        if settings.tick_period < MIN_TICK_PERIOD {
            warn!(tick_ms = settings.tick_period.as_millis() as u64, "tick period clamped to 1ms");
            settings.tick_period = MIN_TICK_PERIOD;
        }
        Self {
            table: RwLock::new(RoomTable {
                rooms: HashMap::new(),
                rng: SimpleRng::new(settings.seed),
            }),
            settings,
            outbound,
        }
    }

    async fn handle(&self, room_id: &RoomId) -> Result<Arc<RoomHandle>, RoomError> {
        let table = self.table.read().await;
        table
            .rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))
    }

    /// Register a new room with `owner` as its first member
    pub async fn create(&self, owner: PlayerId, owner_name: &str, name: &str) -> RoomId {
        let mut table = self.table.write().await;
        let id = table.generate_id();
        let seed = self.settings.seed ^ table.rng.next_u32();
        let queue = BlockQueue::new(self.settings.randomizer.source(seed));
        let name = if name.trim().is_empty() {
            id.to_string()
        } else {
            name.trim().to_string()
        };
        let room = Room::new(id.clone(), name, owner, owner_name, queue);
        let handle = Arc::new(RoomHandle {
            id: id.clone(),
            slot: Mutex::new(RoomSlot {
                room,
                ticker: None,
                closed: false,
            }),
        });
        table.rooms.insert(id.clone(), handle);
        info!(room = %id, owner = %owner, "room created");
        id
    }

    pub async fn join(&self, room_id: &RoomId, player: PlayerId, name: &str) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        slot.room.join(player, name)?;
        info!(room = %room_id, player = %player, "player joined");
        Ok(())
    }

    /// Remove `player`; an emptied room is torn down.
    pub async fn leave(&self, room_id: &RoomId, player: PlayerId) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        let emptied = {
            let mut slot = handle.slot.lock().await;
            if slot.closed {
                return Err(RoomError::RoomNotFound(room_id.clone()));
            }
            let empty = slot.room.leave(player)?;
            info!(room = %room_id, player = %player, "player left");
            if empty {
                slot.closed = true;
                slot.ticker.take();
            } else {
                slot.release_idle_ticker();
                let snapshot = slot.room.snapshot();
                send_to(&self.outbound, slot.room.member_ids(), &create_game_state(&snapshot));
            }
            empty
        };

        if emptied {
            self.remove_entry(&handle).await;
        }
        Ok(())
    }

    async fn remove_entry(&self, handle: &Arc<RoomHandle>) {
        let mut table = self.table.write().await;
        let registered = table
            .rooms
            .get(&handle.id)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if registered {
            table.rooms.remove(&handle.id);
            info!(room = %handle.id, "room torn down");
        }
    }

    /// Start the room's game and its tick driver.
    ///
    /// Every member receives `gameStarted` and a first `gameState`.
    pub async fn start_game(
        &self,
        room_id: &RoomId,
        player: PlayerId,
    ) -> Result<ArrayVec<PieceKind, PREVIEW_LEN>, RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        let was_running = slot.room.is_running();
        let preview = slot.room.start(player)?;
        if was_running {
            return Ok(preview);
        }

        if slot.room.is_running() {
            let stale = slot.ticker.as_ref().is_some_and(TickDriver::is_finished);
            if slot.ticker.is_none() || stale {
                slot.ticker = Some(TickDriver::spawn(
                    Arc::downgrade(&handle),
                    self.settings.tick_period,
                    self.outbound.clone(),
                ));
            }
        }

        let members = slot.room.member_ids();
        send_to(&self.outbound, members.clone(), &create_game_started(room_id, preview.clone()));
        let snapshot = slot.room.snapshot();
        send_to(&self.outbound, members, &create_game_state(&snapshot));
        Ok(preview)
    }

    /// Apply a player command. `Ok(false)` means it was ignored.
    pub async fn command(
        &self,
        room_id: &RoomId,
        player: PlayerId,
        action: GameAction,
    ) -> Result<bool, RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        let changed = slot.room.apply(player, action).map_err(|err| {
            if matches!(err, RoomError::InvariantViolation(_)) {
                warn!(room = %room_id, player = %player, error = %err, "command rejected");
            }
            err
        })?;

        let released = slot.release_idle_ticker();
        if changed || released {
            let snapshot = slot.room.snapshot();
            send_to(&self.outbound, slot.room.member_ids(), &create_game_state(&snapshot));
        }
        Ok(changed)
    }

    /// Return every session in the room to Idle and stop ticking
    pub async fn reset_game(&self, room_id: &RoomId, player: PlayerId) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        slot.room.reset(player)?;
        slot.ticker.take();
        info!(room = %room_id, player = %player, "game reset");
        let snapshot = slot.room.snapshot();
        send_to(&self.outbound, slot.room.member_ids(), &create_game_state(&snapshot));
        Ok(())
    }

    pub async fn set_ready(&self, room_id: &RoomId, player: PlayerId, ready: bool) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        slot.room.set_ready(player, ready)?;
        let snapshot = slot.room.snapshot();
        send_to(&self.outbound, slot.room.member_ids(), &create_game_state(&snapshot));
        Ok(())
    }

    /// Change a member's display name as shown in snapshots
    pub async fn rename(&self, room_id: &RoomId, player: PlayerId, name: &str) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        slot.room.rename(player, name)?;
        let snapshot = slot.room.snapshot();
        send_to(&self.outbound, slot.room.member_ids(), &create_game_state(&snapshot));
        Ok(())
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot, RoomError> {
        let handle = self.handle(room_id).await?;
        let slot = handle.slot.lock().await;
        if slot.closed {
            return Err(RoomError::RoomNotFound(room_id.clone()));
        }
        Ok(slot.room.snapshot())
    }

    /// Listing of every open room, ordered by id
    pub async fn rooms_list(&self) -> Vec<RoomSummary> {
        let handles: Vec<Arc<RoomHandle>> = {
            let table = self.table.read().await;
            table.rooms.values().cloned().collect()
        };

        let mut rooms = Vec::with_capacity(handles.len());
        for handle in handles {
            let slot = handle.slot.lock().await;
            if !slot.closed {
                rooms.push(slot.room.summary());
            }
        }
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    /// Send the current listing to every connected client
    pub async fn broadcast_rooms_list(&self) {
        let rooms = self.rooms_list().await;
        broadcast(&self.outbound, &create_rooms_list(&rooms));
    }

    /// Whether the room currently holds a live tick driver
    pub async fn is_ticking(&self, room_id: &RoomId) -> bool {
        let Ok(handle) = self.handle(room_id).await else {
            return false;
        };
        let slot = handle.slot.lock().await;
        slot.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.table.read().await.rooms.contains_key(room_id)
    }

    pub async fn room_count(&self) -> usize {
        self.table.read().await.rooms.len()
    }
}

//! Room - a set of player sessions sharing one block queue
//!
//! The room is the unit of serialization: every mutation (tick, command,
//! join, leave) takes `&mut self`, so whoever owns the room decides how
//! concurrent callers are ordered. The room itself knows nothing about timers
//! or sockets; it only reports whether it is still running so the owner can
//! stop its tick driver.
//!
//! # Running policy
//!
//! - `start` resets every session and spawns a first piece for each.
//! - The room runs while at least one session is Falling or Locking.
//! - A session reaching GameOver does not touch the other sessions; the room
//!   stops once no session is left in play.
//! - `reset` returns every session to Idle and stops the room.

use std::collections::BTreeMap;

use arrayvec::ArrayVec;
use tracing::{info, warn};

use crate::error::RoomError;
use crate::queue::BlockQueue;
use crate::session::{CommitReport, PlayerSession, TickOutcome};
use crate::snapshot::{RoomSnapshot, RoomSummary};
use tetris_rooms_types::{GameAction, PieceKind, PlayerId, RoomId, PREVIEW_LEN};

/// What a single tick did across the room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub commits: Vec<(PlayerId, CommitReport)>,
    /// Sessions that reached GameOver on this tick
    pub game_overs: Vec<PlayerId>,
    /// The room was running before this tick and is not anymore
    pub stopped: bool,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    owner: PlayerId,
    queue: BlockQueue,
    sessions: BTreeMap<PlayerId, PlayerSession>,
    running: bool,
}

impl Room {
    /// Create a room with its owner as the first member
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        owner: PlayerId,
        owner_name: impl Into<String>,
        queue: BlockQueue,
    ) -> Self {
        let mut sessions = BTreeMap::new();
        sessions.insert(owner, PlayerSession::new(owner, owner_name));
        Self {
            id,
            name: name.into(),
            owner,
            queue,
            sessions,
            running: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    /// Member ids in ascending order
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.sessions.keys().copied().collect()
    }

    pub fn session(&self, player: PlayerId) -> Option<&PlayerSession> {
        self.sessions.get(&player)
    }

    pub fn session_mut(&mut self, player: PlayerId) -> Option<&mut PlayerSession> {
        self.sessions.get_mut(&player)
    }

    pub fn queue(&self) -> &BlockQueue {
        &self.queue
    }

    /// Add a player. Joining a running room yields an Idle session that
    /// takes part from the next start.
    pub fn join(&mut self, player: PlayerId, name: impl Into<String>) -> Result<(), RoomError> {
        if self.sessions.contains_key(&player) {
            return Err(RoomError::AlreadyMember(player));
        }
        self.sessions.insert(player, PlayerSession::new(player, name));
        Ok(())
    }

    /// Remove a player. Returns true if the room is now empty.
    ///
    /// An empty room is never left running.
    pub fn leave(&mut self, player: PlayerId) -> Result<bool, RoomError> {
        if self.sessions.remove(&player).is_none() {
            return Err(RoomError::PlayerNotFound(player));
        }
        if player == self.owner {
            if let Some(next) = self.sessions.keys().next() {
                self.owner = *next;
            }
        }
        if self.running && !self.any_in_play() {
            self.running = false;
        }
        Ok(self.sessions.is_empty())
    }

    /// Start a new game for every member and return the queue preview.
    ///
    /// Starting a room that is already running changes nothing.
    pub fn start(&mut self, by: PlayerId) -> Result<ArrayVec<PieceKind, PREVIEW_LEN>, RoomError> {
        if !self.sessions.contains_key(&by) {
            return Err(RoomError::PlayerNotFound(by));
        }
        if self.running {
            return Ok(self.queue.preview());
        }
        for session in self.sessions.values_mut() {
            session.start(&mut self.queue);
        }
        self.running = self.any_in_play();
        info!(room = %self.id, players = self.sessions.len(), "game started");
        Ok(self.queue.preview())
    }

    /// Return every session to Idle and stop the room
    pub fn reset(&mut self, by: PlayerId) -> Result<(), RoomError> {
        if !self.sessions.contains_key(&by) {
            return Err(RoomError::PlayerNotFound(by));
        }
        for session in self.sessions.values_mut() {
            session.reset();
        }
        self.running = false;
        Ok(())
    }

    /// Apply gravity to every session once.
    ///
    /// A failure in one session is logged and leaves that session as it
    /// was; the others still advance.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }
        if self.sessions.is_empty() {
            warn!(room = %self.id, "running room has no sessions, stopping");
            self.running = false;
            report.stopped = true;
            return report;
        }

        for (id, session) in self.sessions.iter_mut() {
            match session.gravity(&mut self.queue) {
                Ok(TickOutcome::Committed(commit)) => {
                    if commit.game_over {
                        report.game_overs.push(*id);
                    }
                    report.commits.push((*id, commit));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(room = %self.id, player = %id, error = %err, "tick skipped for session");
                }
            }
        }

        if !self.any_in_play() {
            self.running = false;
            report.stopped = true;
            info!(room = %self.id, "no sessions left in play, room stopped");
        }
        report
    }

    /// Run a player command against that player's session only.
    ///
    /// `Ok(false)` means the command was ignored (illegal or not accepted in
    /// the current state).
    pub fn apply(&mut self, player: PlayerId, action: GameAction) -> Result<bool, RoomError> {
        let session = self
            .sessions
            .get_mut(&player)
            .ok_or(RoomError::PlayerNotFound(player))?;
        let changed = session.apply(action, &mut self.queue)?;
        if self.running && !self.any_in_play() {
            self.running = false;
            info!(room = %self.id, "no sessions left in play, room stopped");
        }
        Ok(changed)
    }

    pub fn set_ready(&mut self, player: PlayerId, ready: bool) -> Result<(), RoomError> {
        let session = self
            .sessions
            .get_mut(&player)
            .ok_or(RoomError::PlayerNotFound(player))?;
        session.set_ready(ready);
        Ok(())
    }

    pub fn rename(&mut self, player: PlayerId, name: impl Into<String>) -> Result<(), RoomError> {
        let session = self
            .sessions
            .get_mut(&player)
            .ok_or(RoomError::PlayerNotFound(player))?;
        session.set_name(name);
        Ok(())
    }

    fn any_in_play(&self) -> bool {
        self.sessions.values().any(|s| s.state().is_active())
    }

    /// Read-only view of the whole room; repeated calls without an
    /// intervening mutation are equal.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            is_playing: self.running,
            next_blocks: self.queue.preview(),
            players: self.sessions.values().map(PlayerSession::snapshot).collect(),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner,
            member_ids: self.member_ids(),
            is_playing: self.running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedSource;
    use crate::session::SessionState;
    use tetris_rooms_types::Direction;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    fn room_with(script: &[PieceKind]) -> Room {
        let queue = BlockQueue::new(Box::new(ScriptedSource::new(script.to_vec())));
        Room::new(RoomId::from("room01"), "test", P1, "alice", queue)
    }

    #[test]
    fn owner_is_first_member() {
        let room = room_with(&[PieceKind::O]);
        assert_eq!(room.owner(), P1);
        assert_eq!(room.member_ids(), vec![P1]);
        assert!(!room.is_running());
    }

    #[test]
    fn running_room_without_sessions_stops_on_tick() {
        let mut room = room_with(&[PieceKind::O]);
        room.start(P1).unwrap();
        room.sessions.clear();

        let report = room.tick();
        assert!(report.stopped);
        assert!(report.commits.is_empty());
        assert!(!room.is_running());
        assert_eq!(room.tick(), TickReport::default());
    }

    #[test]
    fn rename_updates_snapshot_name() {
        let mut room = room_with(&[PieceKind::O]);
        room.rename(P1, "alicia").unwrap();
        assert_eq!(room.snapshot().players[0].name, "alicia");
        assert_eq!(room.rename(P2, "bob"), Err(RoomError::PlayerNotFound(P2)));
    }

    #[test]
    fn join_twice_is_rejected() {
        let mut room = room_with(&[PieceKind::O]);
        room.join(P2, "bob").unwrap();
        assert_eq!(room.join(P2, "bob"), Err(RoomError::AlreadyMember(P2)));
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn leave_migrates_owner_and_reports_empty() {
        let mut room = room_with(&[PieceKind::O]);
        room.join(PlayerId(7), "carol").unwrap();
        room.join(P2, "bob").unwrap();

        assert_eq!(room.leave(P1), Ok(false));
        assert_eq!(room.owner(), P2);
        assert_eq!(room.leave(PlayerId(9)), Err(RoomError::PlayerNotFound(PlayerId(9))));
        assert_eq!(room.leave(P2), Ok(false));
        assert_eq!(room.owner(), PlayerId(7));
        assert_eq!(room.leave(PlayerId(7)), Ok(true));
        assert!(room.is_empty());
    }

    #[test]
    fn start_requires_membership() {
        let mut room = room_with(&[PieceKind::O]);
        assert_eq!(room.start(P2), Err(RoomError::PlayerNotFound(P2)));
        assert!(!room.is_running());
    }

    #[test]
    fn start_returns_preview_and_spawns_every_session() {
        use PieceKind::*;
        let mut room = room_with(&[I, J, L, O, S, T, Z]);
        room.join(P2, "bob").unwrap();

        let preview = room.start(P1).unwrap();
        // I and J went to the two sessions
        assert_eq!(preview.as_slice(), &[L, O, S]);
        assert_eq!(room.session(P1).unwrap().active().unwrap().kind, I);
        assert_eq!(room.session(P2).unwrap().active().unwrap().kind, J);
        assert!(room.is_running());

        // Starting again is a no-op
        assert_eq!(room.start(P2).unwrap(), preview);
        assert_eq!(room.session(P1).unwrap().active().unwrap().kind, I);
    }

    #[test]
    fn o_piece_falls_and_commits_at_row_18() {
        let mut room = room_with(&[PieceKind::O]);
        room.start(P1).unwrap();

        let mut ticks = 0;
        while room.session(P1).unwrap().state() == SessionState::Falling {
            room.tick();
            ticks += 1;
            assert!(ticks <= 20);
        }
        assert_eq!(room.session(P1).unwrap().active().unwrap().row, 18);

        let report = room.tick();
        assert_eq!(report.commits.len(), 1);
        let (player, commit) = report.commits[0];
        assert_eq!(player, P1);
        assert_eq!(commit.row, 18);
        assert_eq!(commit.lines_cleared, 0);

        let session = room.session(P1).unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(session.active().unwrap().row, 0);
        assert_eq!(session.state(), SessionState::Falling);
    }

    #[test]
    fn filling_last_cell_clears_line_and_scores_100() {
        let mut room = room_with(&[PieceKind::I]);
        room.start(P1).unwrap();
        {
            let session = room.session_mut(P1).unwrap();
            for col in (0..10).filter(|c| *c != 5) {
                session.grid_mut().set(19, col, Some(PieceKind::L));
            }
            session.grid_mut().set(18, 0, Some(PieceKind::T));
        }

        // Vertical I sits in column 5
        assert!(room.apply(P1, GameAction::Rotate).unwrap());
        assert!(room.apply(P1, GameAction::HardDrop).unwrap());

        let session = room.session(P1).unwrap();
        assert_eq!(session.score(), 100);
        assert_eq!(session.lines(), 1);
        let grid = session.grid();
        assert_eq!(grid.get(19, 0), Some(Some(PieceKind::T)));
        for row in 17..20 {
            assert_eq!(grid.get(row, 5), Some(Some(PieceKind::I)));
        }
        assert_eq!(grid.get(16, 5), Some(None));
        assert_eq!(grid.filled(), 4);
    }

    #[test]
    fn game_over_leaves_other_player_running() {
        let mut room = room_with(&[PieceKind::O]);
        room.join(P2, "bob").unwrap();
        room.start(P1).unwrap();

        {
            let grid = room.session_mut(P1).unwrap().grid_mut();
            grid.set(2, 3, Some(PieceKind::Z));
            grid.set(2, 4, Some(PieceKind::Z));
        }

        // P1 rests on the blocks at once, then commits into the spawn area
        room.tick();
        assert_eq!(room.session(P1).unwrap().state(), SessionState::Locking);
        let report = room.tick();
        assert_eq!(report.game_overs, vec![P1]);
        assert!(!report.stopped);

        assert_eq!(room.session(P1).unwrap().state(), SessionState::GameOver);
        let p2 = room.session(P2).unwrap();
        assert_eq!(p2.state(), SessionState::Falling);
        assert_eq!(p2.active().unwrap().row, 2);
        assert!(room.is_running());

        // P1 no longer moves; P2 keeps falling
        assert_eq!(room.apply(P1, GameAction::Move(Direction::Left)), Ok(false));
        room.tick();
        assert_eq!(room.session(P2).unwrap().active().unwrap().row, 3);
    }

    #[test]
    fn room_stops_when_last_session_tops_out() {
        let mut room = room_with(&[PieceKind::O]);
        room.start(P1).unwrap();

        let mut stopped = false;
        for _ in 0..500 {
            let report = room.tick();
            if report.stopped {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
        assert!(!room.is_running());
        assert!(!room.snapshot().is_playing);
        assert_eq!(room.tick(), TickReport::default());
    }

    #[test]
    fn leaving_last_active_player_stops_room() {
        let mut room = room_with(&[PieceKind::T]);
        room.start(P1).unwrap();
        room.join(P2, "bob").unwrap();
        assert!(room.is_running());
        assert_eq!(room.leave(P1), Ok(false));
        assert!(!room.is_running());
    }

    #[test]
    fn reset_returns_everyone_to_idle() {
        let mut room = room_with(&[PieceKind::S]);
        room.join(P2, "bob").unwrap();
        room.start(P2).unwrap();
        room.apply(P1, GameAction::HardDrop).unwrap();
        room.reset(P1).unwrap();

        assert!(!room.is_running());
        for id in [P1, P2] {
            let session = room.session(id).unwrap();
            assert_eq!(session.state(), SessionState::Idle);
            assert_eq!(session.grid().filled(), 0);
        }
    }

    #[test]
    fn snapshot_overlays_without_mutating() {
        let mut room = room_with(&[PieceKind::T]);
        room.set_ready(P1, true).unwrap();
        room.start(P1).unwrap();

        let first = room.snapshot();
        let second = room.snapshot();
        assert_eq!(first, second);
        assert!(first.is_playing);
        assert_eq!(first.next_blocks.len(), PREVIEW_LEN);

        let player = first.player(P1).unwrap();
        assert!(player.ready);
        assert_eq!(player.board[0][4], Some(PieceKind::T));
        assert_eq!(player.board[1][3], Some(PieceKind::T));
        assert_eq!(room.session(P1).unwrap().grid().filled(), 0);
    }

    #[test]
    fn commands_for_unknown_player_are_not_found() {
        let mut room = room_with(&[PieceKind::O]);
        assert_eq!(
            room.apply(P2, GameAction::Rotate),
            Err(RoomError::PlayerNotFound(P2))
        );
        assert_eq!(room.set_ready(P2, true), Err(RoomError::PlayerNotFound(P2)));
    }

    #[test]
    fn summary_lists_members() {
        let mut room = room_with(&[PieceKind::O]);
        room.join(P2, "bob").unwrap();
        let summary = room.summary();
        assert_eq!(summary.id.as_str(), "room01");
        assert_eq!(summary.name, "test");
        assert_eq!(summary.owner_id, P1);
        assert_eq!(summary.member_ids, vec![P1, P2]);
        assert!(!summary.is_playing);
    }
}

//! Room tests - end-to-end game flows on the pure core

use tetris_rooms::core::{BlockQueue, Room, RoomError, ScriptedSource, SessionState};
use tetris_rooms::types::{Direction, GameAction, PieceKind, PlayerId, RoomId, QUEUE_MIN_LEN};

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);

fn room(script: Vec<PieceKind>) -> Room {
    let queue = BlockQueue::new(Box::new(ScriptedSource::new(script)));
    Room::new(RoomId::from("e2e001"), "e2e", ALICE, "alice", queue)
}

#[test]
fn test_single_o_piece_lifecycle() {
    let mut room = room(vec![PieceKind::O]);
    room.start(ALICE).unwrap();
    let spawned = room.session(ALICE).unwrap().active().unwrap();
    assert_eq!((spawned.kind, spawned.row, spawned.col), (PieceKind::O, 0, 3));

    let mut commit = None;
    for _ in 0..40 {
        let report = room.tick();
        if let Some((_, c)) = report.commits.first() {
            commit = Some(*c);
            break;
        }
    }

    let commit = commit.expect("piece never committed");
    assert_eq!(commit.row, 18);
    assert_eq!(commit.lines_cleared, 0);
    let session = room.session(ALICE).unwrap();
    assert_eq!(session.score(), 0);
    assert_eq!(session.pieces(), 1);
    assert_eq!(session.active().unwrap().row, 0);
}

#[test]
fn test_all_players_draw_the_same_sequence() {
    use PieceKind::*;
    let mut room = room(vec![T, S, Z, I, O, L, J]);
    room.join(BOB, "bob").unwrap();
    room.start(BOB).unwrap();

    let mut seen = vec![
        room.session(ALICE).unwrap().active().unwrap().kind,
        room.session(BOB).unwrap().active().unwrap().kind,
    ];
    for _ in 0..5 {
        room.apply(ALICE, GameAction::HardDrop).unwrap();
        seen.push(room.session(ALICE).unwrap().active().unwrap().kind);
        room.apply(BOB, GameAction::HardDrop).unwrap();
        seen.push(room.session(BOB).unwrap().active().unwrap().kind);
    }
    // Interleaved draws from one FIFO
    assert_eq!(seen, vec![T, S, Z, I, O, L, J, T, S, Z, I, O]);
    assert!(room.queue().len() >= QUEUE_MIN_LEN);
}

#[test]
fn test_moves_then_drop_lands_in_column() {
    let mut room = room(vec![PieceKind::O]);
    room.start(ALICE).unwrap();
    for _ in 0..10 {
        room.apply(ALICE, GameAction::Move(Direction::Right)).unwrap();
    }
    assert_eq!(room.session(ALICE).unwrap().active().unwrap().col, 8);
    assert!(room.apply(ALICE, GameAction::HardDrop).unwrap());

    let grid = room.session(ALICE).unwrap().grid();
    assert_eq!(grid.get(19, 8), Some(Some(PieceKind::O)));
    assert_eq!(grid.get(19, 9), Some(Some(PieceKind::O)));
}

#[test]
fn test_game_over_isolated_to_one_player() {
    let mut room = room(vec![PieceKind::O]);
    room.join(BOB, "bob").unwrap();
    room.start(ALICE).unwrap();

    // Ten O pieces stacked in columns 3-4 top out the board
    let mut drops = 0;
    while room.session(ALICE).unwrap().state() != SessionState::GameOver {
        room.apply(ALICE, GameAction::HardDrop).unwrap();
        drops += 1;
        assert!(drops <= 10);
    }
    assert_eq!(drops, 10);

    assert!(room.is_running());
    assert_eq!(room.session(BOB).unwrap().state(), SessionState::Falling);
    room.tick();
    assert_eq!(room.session(BOB).unwrap().active().unwrap().row, 1);

    let snapshot = room.snapshot();
    assert_eq!(snapshot.player(ALICE).unwrap().state, SessionState::GameOver);
    assert!(snapshot.is_playing);
}

#[test]
fn test_errors_do_not_touch_state() {
    let mut room = room(vec![PieceKind::T]);
    room.start(ALICE).unwrap();
    let before = room.snapshot();

    assert_eq!(
        room.apply(BOB, GameAction::HardDrop),
        Err(RoomError::PlayerNotFound(BOB))
    );
    assert_eq!(room.join(ALICE, "again"), Err(RoomError::AlreadyMember(ALICE)));
    assert_eq!(room.snapshot(), before);
}

//! Block queue - the room-wide buffer of upcoming pieces
//!
//! All sessions in a room draw from the same queue, so every player sees the
//! same upcoming pieces. Draws are FIFO and the buffer is topped back up to
//! [`QUEUE_MIN_LEN`] after every draw, so it never starves.

use std::collections::VecDeque;
use std::fmt;

use arrayvec::ArrayVec;

use crate::rng::PieceSource;
use tetris_rooms_types::{PieceKind, PREVIEW_LEN, QUEUE_MIN_LEN};

pub struct BlockQueue {
    pending: VecDeque<PieceKind>,
    source: Box<dyn PieceSource>,
}

impl BlockQueue {
    /// Create a queue pre-filled from `source`
    pub fn new(source: Box<dyn PieceSource>) -> Self {
        let mut queue = Self {
            pending: VecDeque::with_capacity(QUEUE_MIN_LEN + 1),
            source,
        };
        queue.replenish();
        queue
    }

    fn replenish(&mut self) {
        while self.pending.len() < QUEUE_MIN_LEN {
            self.pending.push_back(self.source.next_piece());
        }
    }

    /// Take the head of the queue
    pub fn pop(&mut self) -> PieceKind {
        let kind = match self.pending.pop_front() {
            Some(kind) => kind,
            None => self.source.next_piece(),
        };
        self.replenish();
        kind
    }

    /// Head of the queue without consuming it
    pub fn peek(&self) -> Option<PieceKind> {
        self.pending.front().copied()
    }

    /// The next [`PREVIEW_LEN`] pieces, head first
    pub fn preview(&self) -> ArrayVec<PieceKind, PREVIEW_LEN> {
        self.pending.iter().copied().take(PREVIEW_LEN).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.pending.iter().copied()
    }
}

impl fmt::Debug for BlockQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockQueue")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedSource, UniformSource};

    #[test]
    fn starts_full() {
        let queue = BlockQueue::new(Box::new(UniformSource::new(1)));
        assert_eq!(queue.len(), QUEUE_MIN_LEN);
    }

    #[test]
    fn pop_returns_previous_head_and_refills() {
        let mut queue = BlockQueue::new(Box::new(UniformSource::new(42)));
        for _ in 0..100 {
            let head = queue.peek().unwrap();
            assert_eq!(queue.pop(), head);
            assert!(queue.len() >= QUEUE_MIN_LEN);
        }
    }

    #[test]
    fn preview_is_head_first_and_read_only() {
        use PieceKind::*;
        let queue = BlockQueue::new(Box::new(ScriptedSource::new([I, J, L, O, S, T, Z])));
        let preview = queue.preview();
        assert_eq!(preview.as_slice(), &[I, J, L]);
        assert_eq!(queue.preview(), preview);
        assert_eq!(queue.len(), QUEUE_MIN_LEN);
    }

    #[test]
    fn fifo_order_follows_source() {
        use PieceKind::*;
        let script = [T, S, Z, I, O, L, J];
        let mut queue = BlockQueue::new(Box::new(ScriptedSource::new(script)));
        let drawn: Vec<_> = (0..14).map(|_| queue.pop()).collect();
        assert_eq!(&drawn[..7], &script);
        assert_eq!(&drawn[7..], &script);
    }
}

//! Per-room gravity driver.
//!
//! A [`TickDriver`] owns the task that ticks one room at a fixed period. It is
//! stored inside the room's slot, so it is released on every path that drops
//! or empties the room: dropping the driver aborts the task, and aborting an
//! already finished task is a no-op.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::outbound::{send_to, OutboundSender};
use crate::protocol::create_game_state;
use crate::registry::RoomHandle;

#[derive(Debug)]
pub struct TickDriver {
    task: JoinHandle<()>,
}

impl TickDriver {
    /// Start ticking `room` every `period`, first tick one period from now.
    pub fn spawn(room: Weak<RoomHandle>, period: Duration, outbound: OutboundSender) -> Self {
        let task = tokio::spawn(run(room, period, outbound));
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(room: Weak<RoomHandle>, period: Duration, outbound: OutboundSender) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let Some(handle) = room.upgrade() else {
            break;
        };
        let mut slot = handle.slot.lock().await;
        if slot.closed {
            break;
        }

        let report = slot.room.tick();
        let snapshot = slot.room.snapshot();
        send_to(&outbound, slot.room.member_ids(), &create_game_state(&snapshot));

        if report.stopped || !slot.room.is_running() {
            debug!(room = %handle.id, "tick driver finished");
            // This task is the driver being released; the abort lands after
            // the loop has already ended.
            slot.ticker.take();
            break;
        }
    }
}

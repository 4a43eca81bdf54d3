//! The per-round voting countdown.
//!
//! One task per voting round, ticking once a second against the room lock.
//! Cancellation is by epoch: `RoundTimer` counts countdown generations,
//! every task remembers the epoch it was spawned under, and a tick whose
//! epoch no longer matches stops without touching anything. Aborting the
//! task on cancel just saves the pointless wakeups.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{AppState, GameRoom};
use crate::types::RoundStatus;

#[derive(Debug, Default)]
pub struct RoundTimer {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

impl RoundTimer {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Invalidate the current countdown, aborting its task if one is still
    /// running. Returns the epoch a replacement countdown must run under.
    pub fn cancel(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.epoch += 1;
        self.epoch
    }

    /// Invalidate from within the countdown task itself as it finishes.
    pub fn expire(&mut self) {
        self.handle = None;
        self.epoch += 1;
    }

    pub fn attach(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }
}

impl AppState {
    /// Put the room into Voting and start a fresh countdown for it.
    pub fn start_voting(self: &Arc<Self>, room: &mut GameRoom) {
        let epoch = room.timer.cancel();
        room.game.status = RoundStatus::Voting;
        room.game.timer = self.config.vote_seconds;
        room.tally.clear();
        let handle = spawn_vote_timer(self.clone(), epoch);
        room.timer.attach(handle);
    }
}

/// Tick the voting countdown once a second until it expires or goes stale.
pub fn spawn_vote_timer(state: Arc<AppState>, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;

            let mut guard = state.room.lock().await;
            let room = &mut *guard;
            if room.timer.epoch() != epoch || room.game.status != RoundStatus::Voting {
                return;
            }

            room.game.timer = room.game.timer.saturating_sub(1);
            if room.game.timer == 0 {
                room.resolve_round(&state.config);
                return;
            }
            room.broadcast_state();
        }
    })
}

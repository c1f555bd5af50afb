// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control channel: one `tokio::sync::broadcast` topic carrying both
//! envelope kinds the specification calls for (`Evict` and `Ack`), each
//! tagged with the `ActorId` it's addressed to. Every actor holds its own
//! `Receiver` from `subscribe()` and filters out messages not meant for it
//! — "a tag per actor is the simplest strategy" (§9).

use tokio::sync::broadcast;

use crate::types::ActorId;

/// Default channel depth. Generous relative to `P` so a burst of evictions
/// never lags a slow receiver under normal scheduling.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Captain-issued forced disembark, addressed to one passenger.
    Evict { target: ActorId, trip_no: u64 },
    /// Passenger-issued acknowledgement, addressed to the captain's mailbox.
    Ack { actor: ActorId, trip_no: u64 },
}

#[derive(Clone)]
pub struct ControlChannel {
    tx: broadcast::Sender<ControlMessage>,
}

impl ControlChannel {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlMessage> {
        self.tx.subscribe()
    }

    /// Broadcast an `Evict` to the target passenger. A send failure means no
    /// receivers remain (every passenger has already exited); that is not an
    /// error — the clearing loop will observe an empty gangway regardless.
    pub fn send_evict(&self, target: ActorId, trip_no: u64) {
        let _ = self.tx.send(ControlMessage::Evict { target, trip_no });
    }

    /// Acknowledge a completed eviction.
    pub fn send_ack(&self, actor: ActorId, trip_no: u64) {
        let _ = self.tx.send(ControlMessage::Ack { actor, trip_no });
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking inbox drain for a passenger: returns the trip number of an
/// `Evict` addressed to `me`, if one is waiting, discarding everything else
/// (including a `Lagged` gap, treated as a transient interruption — see
/// DESIGN.md for why dropping is safe here).
pub fn drain_evict_for(rx: &mut broadcast::Receiver<ControlMessage>, me: ActorId) -> Option<u64> {
    loop {
        match rx.try_recv() {
            Ok(ControlMessage::Evict { target, trip_no }) if target == me => return Some(trip_no),
            Ok(_) => continue,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;

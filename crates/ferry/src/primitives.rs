// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three counting primitives (seats, bikes, bridge units), modeled as
//! `tokio::sync::Semaphore`s per §9: "Implementations may use
//! host-provided counting semaphores... observable semantics are
//! identical." Acquisition is non-blocking (`try_acquire*`) everywhere
//! except the one documented disembark exception.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Backoff used while the disembark path retries `bridge_units`.
const DISEMBARK_RETRY: Duration = Duration::from_millis(5);

pub struct CountingPrimitives {
    pub seats: Arc<Semaphore>,
    pub bikes: Arc<Semaphore>,
    pub bridge_units: Arc<Semaphore>,
}

impl CountingPrimitives {
    pub fn new(n: u32, m: u32, k: u32) -> Self {
        Self {
            seats: Arc::new(Semaphore::new(n as usize)),
            bikes: Arc::new(Semaphore::new(m as usize)),
            bridge_units: Arc::new(Semaphore::new(k as usize)),
        }
    }

    /// Try to reserve one seat. Non-blocking.
    pub fn try_seat(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.seats).try_acquire_owned().ok()
    }

    /// Try to reserve one bike slot. Non-blocking.
    pub fn try_bike(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.bikes).try_acquire_owned().ok()
    }

    /// Try to reserve `units` gangway atoms, all-or-nothing in one call.
    ///
    /// `Semaphore::try_acquire_many_owned` cannot partially succeed, which is
    /// exactly the property the specification calls "the single most subtle
    /// point": a `units=2` passenger can never end up holding one atom while
    /// blocked on the second.
    pub fn try_bridge_units(&self, units: u32) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.bridge_units).try_acquire_many_owned(units).ok()
    }

    /// Disembark is the one path allowed to eventually block: the captain
    /// never contends for `bridge_units` during `Unloading`, so this always
    /// makes progress. Cancellable via `shutdown` so a passenger stuck here
    /// during a hard shutdown doesn't hang the supervisor's join.
    pub async fn acquire_bridge_units_blocking(
        &self,
        units: u32,
        shutdown: &CancellationToken,
    ) -> Option<OwnedSemaphorePermit> {
        loop {
            if let Some(permit) = self.try_bridge_units(units) {
                return Some(permit);
            }
            tokio::select! {
                _ = tokio::time::sleep(DISEMBARK_RETRY) => {}
                _ = shutdown.cancelled() => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "primitives_tests.rs"]
mod tests;

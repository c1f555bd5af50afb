// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared region: everything the captain, console, and every passenger
//! touch in common. Scalar state lives behind one `tokio::sync::Mutex`
//! (§5: "bounded regions only, no `.await` while holding it"); the three
//! counting primitives and the control channel are separate, as the
//! specification requires, so a passenger can hold the state lock only
//! for a deque op plus a counter flip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::SimConfig;
use crate::control::ControlChannel;
use crate::error::SimError;
use crate::gangway::Gangway;
use crate::log::Logger;
use crate::primitives::CountingPrimitives;
use crate::types::{ActorId, Direction, GangwayDirection, Phase};

/// Everything mutated only under `state`'s mutex guard.
pub struct State {
    pub phase: Phase,
    pub direction: Direction,
    pub boarding_open: bool,
    pub trip_no: u64,
    pub onboard_pax: u32,
    pub onboard_bikes: u32,
    pub gangway: Gangway,
    pub gangway_dir: GangwayDirection,
    pub captain_id: Option<ActorId>,
}

impl State {
    fn new(config: &SimConfig) -> Self {
        Self {
            phase: Phase::Loading,
            direction: Direction::AtoB,
            boarding_open: false,
            trip_no: 0,
            onboard_pax: 0,
            onboard_bikes: 0,
            gangway: Gangway::new(config.k),
            gangway_dir: GangwayDirection::Idle,
            captain_id: None,
        }
    }

    /// Check invariants 1, 2, 5, 6, 7 from §3/§8. Debug-only: a violation
    /// here is a bug in the coordination protocol, not a runtime condition
    /// any caller should handle.
    #[cfg(debug_assertions)]
    pub fn assert_invariants(&self, config: &SimConfig) {
        assert!(self.onboard_pax <= config.n, "onboard_pax exceeds N");
        assert!(self.onboard_bikes <= config.m, "onboard_bikes exceeds M");
        assert!(self.onboard_bikes <= self.onboard_pax, "onboard_bikes exceeds onboard_pax");
        assert!(self.gangway.load_units() <= config.k, "gangway load exceeds K");
        if self.boarding_open {
            assert_eq!(self.phase, Phase::Loading, "boarding_open outside LOADING");
        }
        if self.phase == Phase::Sailing {
            assert!(self.gangway.is_empty(), "gangway non-empty while SAILING");
            assert_eq!(self.gangway_dir, GangwayDirection::Idle, "gangway_dir set while SAILING");
        }
        if self.gangway_dir == GangwayDirection::Idle {
            // no constraint
        } else {
            assert!(!self.gangway.is_empty(), "gangway_dir set on an empty gangway");
        }
        if self.phase == Phase::Departing {
            assert!(!self.boarding_open, "boarding still open while DEPARTING");
            assert_eq!(self.gangway_dir, GangwayDirection::Out, "gangway_dir not OUT while DEPARTING");
        }
    }

    #[cfg(not(debug_assertions))]
    pub fn assert_invariants(&self, _config: &SimConfig) {}
}

/// Captain-set latches the console flips; read-only from the console's side
/// (it sets, never clears) and read by the captain's wait loops. Same
/// monotone-per-trip shape as `shutdown`, deliberately kept outside the
/// state mutex: the console must never block on the state lock to deliver
/// an operator event.
#[derive(Default)]
pub struct OperatorSignals {
    pub early_depart: AtomicBool,
    pub stop: AtomicBool,
}

impl OperatorSignals {
    pub fn request_early_depart(&self) {
        self.early_depart.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn early_depart_requested(&self) -> bool {
        self.early_depart.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Cleared by the captain at the start of each trip so an early-depart
    /// latched during one trip doesn't carry into the next.
    pub fn reset_early_depart(&self) {
        self.early_depart.store(false, Ordering::SeqCst);
    }
}

/// The shared region (§3), `Arc`-held by every actor. The scalar `shutdown`
/// bit is mirrored as an `AtomicBool` for lock-free fast-path checks per
/// SPEC_FULL §3; the `State` copy inside the mutex is authoritative for
/// anything observed together with other fields in one critical section.
pub struct SharedRegion {
    pub config: SimConfig,
    state: Mutex<State>,
    shutdown_flag: AtomicBool,
    pub shutdown: CancellationToken,
    pub operator: OperatorSignals,
    pub primitives: CountingPrimitives,
    pub control: ControlChannel,
    pub logger: Logger,
}

/// A point-in-time read of the fields a passenger needs to decide whether
/// to proceed (§4.3 step 2).
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub boarding_open: bool,
    pub direction: Direction,
    pub shutdown: bool,
}

impl SharedRegion {
    pub fn new(config: SimConfig, logger: Logger) -> Arc<Self> {
        let primitives = CountingPrimitives::new(config.n, config.m, config.k);
        Arc::new(Self {
            state: Mutex::new(State::new(&config)),
            shutdown_flag: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            operator: OperatorSignals::default(),
            primitives,
            control: ControlChannel::new(),
            logger,
            config,
        })
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, State> {
        self.state.lock().await
    }

    /// §4.3 step 2: atomic snapshot of the fields a passenger decides on.
    pub async fn snapshot(&self) -> StateSnapshot {
        let guard = self.state.lock().await;
        StateSnapshot {
            phase: guard.phase,
            boarding_open: guard.boarding_open,
            direction: guard.direction,
            shutdown: self.is_shutdown(),
        }
    }

    /// Monotone latch: once true, `set_shutdown` is a no-op, matching §3
    /// invariant 8 ("shutdown is monotone, false -> true only").
    pub fn set_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Force the terminal phase as part of supervisor-driven shutdown
    /// (§4.5: "force phase = End, boarding_open = false").
    pub async fn force_end(&self) {
        let mut guard = self.state.lock().await;
        guard.phase = Phase::End;
        guard.boarding_open = false;
    }
}

/// Reset the deque direction once it empties, in the same critical section
/// as the pop that emptied it — invariant 6.
pub fn reset_gangway_dir_if_empty(state: &mut State) {
    if state.gangway.is_empty() {
        state.gangway_dir = GangwayDirection::Idle;
    }
}

/// Release a passenger's onboard-count bookkeeping without a matching
/// disembark, for the shutdown-mid-ride cleanup path (§4.3 "Termination
/// cleanup"). Returns an error only if the counters were already at zero,
/// which would indicate a prior accounting bug.
pub fn withdraw_onboard(state: &mut State, has_bike: bool) -> Result<(), SimError> {
    if state.onboard_pax == 0 {
        return Err(SimError::Resource("onboard_pax underflow on withdrawal".into()));
    }
    state.onboard_pax -= 1;
    if has_bike {
        if state.onboard_bikes == 0 {
            return Err(SimError::Resource("onboard_bikes underflow on withdrawal".into()));
        }
        state.onboard_bikes -= 1;
    }
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

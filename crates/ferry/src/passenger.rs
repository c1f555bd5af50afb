// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The passenger actor (§4.3): a one-shot task that attempts exactly one
//! boarding, bounded by a give-up timer, then rides to completion and
//! disembarks — or is forcibly evicted from the gangway along the way.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, OwnedSemaphorePermit};

use crate::config::PassengerSpawn;
use crate::control::{drain_evict_for, ControlMessage};
use crate::gangway::GangwayEntry;
use crate::state::{reset_gangway_dir_if_empty, withdraw_onboard, SharedRegion};
use crate::types::{ActorId, GangwayDirection, Phase};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

enum BoardOutcome {
    Boarded { seat: OwnedSemaphorePermit, bike: Option<OwnedSemaphorePermit> },
    Done,
}

enum BoardStep {
    Boarded,
    PhaseChanged(u64),
    NotYet,
}

/// Run one passenger to completion. Every exit path (boarded then
/// disembarked, evicted, gave up, shutdown) is a normal termination for a
/// passenger, not a failure — the return type exists only to let the
/// supervisor join the task the same way as every other actor.
pub async fn run_passenger(
    id: ActorId,
    shared: Arc<SharedRegion>,
    spawn: PassengerSpawn,
) -> anyhow::Result<()> {
    let units = 1 + u32::from(spawn.has_bike);
    let give_up_at = tokio::time::Instant::now() + shared.config.give_up;
    let mut rx = shared.control.subscribe();

    let (seat, bike) = loop {
        if let Some(trip_no) = drain_evict_for(&mut rx, id) {
            // Can only be addressed to us if we were already on the
            // gangway in a prior iteration of this same attempt.
            complete_evict_handling(&shared, id, trip_no, None, None, None).await;
            return Ok(());
        }

        let snapshot = shared.snapshot().await;
        if snapshot.shutdown || snapshot.phase == Phase::End {
            shared.logger.record(id, "exit", "shutdown-or-end-before-board");
            return Ok(());
        }

        let direction_ok = spawn.desired_dir.matches(snapshot.direction);
        if snapshot.phase != Phase::Loading || !snapshot.boarding_open || !direction_ok {
            if tokio::time::Instant::now() >= give_up_at {
                shared.logger.record(id, "give-up", "never saw a matching LOADING window");
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        }

        let Some(seat) = shared.primitives.try_seat() else {
            if tokio::time::Instant::now() >= give_up_at {
                shared.logger.record(id, "give-up", "no seat available");
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        };

        let bike = if spawn.has_bike {
            match shared.primitives.try_bike() {
                Some(b) => Some(b),
                None => {
                    drop(seat);
                    if tokio::time::Instant::now() >= give_up_at {
                        shared.logger.record(id, "give-up", "no bike slot available");
                        return Ok(());
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
            }
        } else {
            None
        };

        let Some(bridge) = shared.primitives.try_bridge_units(units) else {
            drop(seat);
            drop(bike);
            if tokio::time::Instant::now() >= give_up_at {
                shared.logger.record(id, "give-up", "no gangway capacity available");
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        };

        let entered = {
            let mut guard = shared.lock().await;
            let direction_ok = spawn.desired_dir.matches(guard.direction);
            let gangway_ok = matches!(guard.gangway_dir, GangwayDirection::Idle | GangwayDirection::In);
            if guard.phase != Phase::Loading || !guard.boarding_open || !direction_ok || !gangway_ok {
                false
            } else {
                guard.gangway_dir = GangwayDirection::In;
                guard
                    .gangway
                    .push_back(GangwayEntry { actor_id: id, units, evicting: false })
                    .is_ok()
            }
        };

        if !entered {
            drop(bridge);
            drop(seat);
            drop(bike);
            if tokio::time::Instant::now() >= give_up_at {
                shared.logger.record(id, "give-up", "lost the race to enter the gangway");
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        }

        shared.logger.record(id, "enter-gangway", &format!("units={units}"));

        match board_loop(&shared, id, &mut rx, spawn.has_bike, seat, bike, bridge).await {
            BoardOutcome::Boarded { seat, bike } => break (seat, bike),
            BoardOutcome::Done => return Ok(()),
        }
    };

    shared.logger.record(id, "boarded", "");
    ride_then_disembark(&shared, id, units, spawn.has_bike, seat, bike).await
}

/// §4.3 step 8, run while physically occupying the gangway. Owns the
/// seat/bike/bridge permits for the duration so every exit path can
/// release exactly what it's holding.
async fn board_loop(
    shared: &Arc<SharedRegion>,
    id: ActorId,
    rx: &mut broadcast::Receiver<ControlMessage>,
    has_bike: bool,
    seat: OwnedSemaphorePermit,
    bike: Option<OwnedSemaphorePermit>,
    bridge: OwnedSemaphorePermit,
) -> BoardOutcome {
    loop {
        if let Some(trip_no) = drain_evict_for(rx, id) {
            complete_evict_handling(shared, id, trip_no, Some(seat), bike, Some(bridge)).await;
            return BoardOutcome::Done;
        }

        let step = {
            let mut guard = shared.lock().await;
            if guard.phase != Phase::Loading || !guard.boarding_open {
                BoardStep::PhaseChanged(guard.trip_no)
            } else if guard.gangway.front().is_some_and(|f| f.actor_id == id && !f.evicting) {
                guard.gangway.pop_front();
                reset_gangway_dir_if_empty(&mut guard);
                guard.onboard_pax += 1;
                if has_bike {
                    guard.onboard_bikes += 1;
                }
                guard.assert_invariants(&shared.config);
                BoardStep::Boarded
            } else {
                BoardStep::NotYet
            }
        };

        match step {
            BoardStep::Boarded => {
                drop(bridge);
                return BoardOutcome::Boarded { seat, bike };
            }
            BoardStep::PhaseChanged(trip_no) => {
                complete_evict_handling(shared, id, trip_no, Some(seat), bike, Some(bridge)).await;
                return BoardOutcome::Done;
            }
            BoardStep::NotYet => {}
        }

        if shared.is_shutdown() {
            let mut guard = shared.lock().await;
            guard.gangway.remove(id);
            reset_gangway_dir_if_empty(&mut guard);
            drop(guard);
            drop(bridge);
            drop(seat);
            drop(bike);
            return BoardOutcome::Done;
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => {
                let mut guard = shared.lock().await;
                guard.gangway.remove(id);
                reset_gangway_dir_if_empty(&mut guard);
                drop(guard);
                drop(bridge);
                drop(seat);
                drop(bike);
                return BoardOutcome::Done;
            }
        }
    }
}

/// §4.3 "Evict-handling": wait for the gangway to be in the OUT direction,
/// reach the tail, release every permit held, and ack. Permits are
/// `Option` because the pre-board drain at the top of the outer loop can
/// in principle reach here holding nothing.
async fn complete_evict_handling(
    shared: &SharedRegion,
    id: ActorId,
    trip_no: u64,
    seat: Option<OwnedSemaphorePermit>,
    bike: Option<OwnedSemaphorePermit>,
    bridge: Option<OwnedSemaphorePermit>,
) {
    loop {
        let out = shared.lock().await.gangway_dir == GangwayDirection::Out;
        if out || shared.is_shutdown() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => break,
        }
    }

    loop {
        let popped = {
            let mut guard = shared.lock().await;
            match guard.gangway.back() {
                Some(back) if back.actor_id == id => {
                    guard.gangway.pop_back();
                    reset_gangway_dir_if_empty(&mut guard);
                    true
                }
                Some(_) => false,
                None => true,
            }
        };
        if popped || shared.is_shutdown() {
            if !popped {
                let mut guard = shared.lock().await;
                guard.gangway.remove(id);
                reset_gangway_dir_if_empty(&mut guard);
            }
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => {
                let mut guard = shared.lock().await;
                guard.gangway.remove(id);
                reset_gangway_dir_if_empty(&mut guard);
                break;
            }
        }
    }

    drop(bridge);
    drop(seat);
    drop(bike);
    shared.control.send_ack(id, trip_no);
    shared.logger.record(id, "evicted", &format!("trip={trip_no}"));
}

/// §4.3 steps 9-10: ride until `Unloading`/`End`/shutdown, then disembark.
async fn ride_then_disembark(
    shared: &Arc<SharedRegion>,
    id: ActorId,
    units: u32,
    has_bike: bool,
    seat: OwnedSemaphorePermit,
    bike: Option<OwnedSemaphorePermit>,
) -> anyhow::Result<()> {
    loop {
        let riding_over = {
            let guard = shared.lock().await;
            matches!(guard.phase, Phase::Unloading | Phase::End)
        };
        if riding_over || shared.is_shutdown() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => break,
        }
    }

    if shared.is_shutdown() {
        let mut guard = shared.lock().await;
        withdraw_onboard(&mut guard, has_bike)?;
        drop(guard);
        drop(seat);
        drop(bike);
        shared.logger.record(id, "abandon-ride", "shutdown before disembark");
        return Ok(());
    }

    let Some(bridge) = shared.primitives.acquire_bridge_units_blocking(units, &shared.shutdown).await
    else {
        let mut guard = shared.lock().await;
        withdraw_onboard(&mut guard, has_bike)?;
        drop(guard);
        drop(seat);
        drop(bike);
        shared.logger.record(id, "abandon-disembark", "shutdown acquiring bridge units");
        return Ok(());
    };

    {
        let mut guard = shared.lock().await;
        if guard.gangway_dir == GangwayDirection::Idle {
            guard.gangway_dir = GangwayDirection::Out;
        }
        guard.gangway.push_front(GangwayEntry { actor_id: id, units, evicting: false })?;
    }

    loop {
        let done = {
            let mut guard = shared.lock().await;
            match guard.gangway.back() {
                Some(back) if back.actor_id == id => {
                    guard.gangway.pop_back();
                    reset_gangway_dir_if_empty(&mut guard);
                    withdraw_onboard(&mut guard, has_bike)?;
                    true
                }
                _ => false,
            }
        };
        if done {
            break;
        }
        if shared.is_shutdown() {
            let mut guard = shared.lock().await;
            guard.gangway.remove(id);
            reset_gangway_dir_if_empty(&mut guard);
            withdraw_onboard(&mut guard, has_bike)?;
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => {
                let mut guard = shared.lock().await;
                guard.gangway.remove(id);
                reset_gangway_dir_if_empty(&mut guard);
                withdraw_onboard(&mut guard, has_bike)?;
                break;
            }
        }
    }

    drop(bridge);
    drop(seat);
    drop(bike);
    shared.logger.record(id, "disembarked", "");
    Ok(())
}

#[cfg(test)]
#[path = "passenger_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The captain actor (§4.2): owns the phase machine and the LIFO
//! eviction handshake that guarantees the gangway is clear before the
//! ferry sails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::control::ControlMessage;
use crate::state::{reset_gangway_dir_if_empty, SharedRegion};
use crate::types::{ActorId, Direction, Phase};

/// Poll interval used by every captain wait loop. Short relative to T1/T2
/// so operator latches and shutdown are observed promptly without busy-spinning.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One completed (or aborted) trip's final tally, handed back to the
/// supervisor for logging and, in tests, direct assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripSummary {
    pub trip_no: u64,
    pub direction: Direction,
    pub passengers: u32,
    pub bikes: u32,
    pub left_bridge: u32,
    pub aborted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepartReason {
    Timer,
    EarlyDepart,
    Stop,
}

enum TripOutcome {
    Completed(TripSummary),
    Shutdown,
}

/// Drive the full trip schedule: up to `config.r` trips, or fewer if a
/// *stop* is latched or global shutdown is observed. Returns the summary
/// of every trip that actually ran.
pub async fn run_captain(shared: Arc<SharedRegion>) -> anyhow::Result<Vec<TripSummary>> {
    {
        let mut guard = shared.lock().await;
        guard.captain_id = Some(ActorId::CAPTAIN);
    }

    let mut rx = shared.control.subscribe();
    let mut summaries = Vec::new();
    let mut trips_done: u32 = 0;

    loop {
        if shared.is_shutdown() {
            shared.force_end().await;
            break;
        }

        match run_trip(&shared, &mut rx).await? {
            TripOutcome::Shutdown => {
                shared.force_end().await;
                break;
            }
            TripOutcome::Completed(summary) => {
                shared.logger.record(
                    ActorId::CAPTAIN,
                    "trip-summary",
                    &format!(
                        "trip={} direction={} passengers={} bikes={} left_bridge={} aborted={}",
                        summary.trip_no,
                        summary.direction,
                        summary.passengers,
                        summary.bikes,
                        summary.left_bridge,
                        summary.aborted
                    ),
                );
                info!(target: "ferry::captain", ?summary, "trip complete");
                let aborted = summary.aborted;
                summaries.push(summary);
                trips_done += 1;

                let mut guard = shared.lock().await;
                if aborted || trips_done >= shared.config.r || shared.operator.stop_requested() {
                    guard.phase = Phase::End;
                    break;
                }
                guard.direction = guard.direction.flipped();
                drop(guard);
            }
        }
    }

    Ok(summaries)
}

/// Run a single trip end to end, returning its summary unless shutdown
/// was observed first.
async fn run_trip(
    shared: &Arc<SharedRegion>,
    rx: &mut broadcast::Receiver<ControlMessage>,
) -> anyhow::Result<TripOutcome> {
    start_trip(shared).await;

    let reason = match wait_for_departure_trigger(shared).await {
        Some(reason) => reason,
        None => return Ok(TripOutcome::Shutdown),
    };

    close_boarding(shared).await;
    let (boarded_pax, boarded_bikes) = snapshot_boarding_stats(shared).await;

    let left_bridge = match clear_gangway(shared, rx).await? {
        Some(count) => count,
        None => return Ok(TripOutcome::Shutdown),
    };

    let (trip_no, direction) = {
        let guard = shared.lock().await;
        (guard.trip_no, guard.direction)
    };

    if reason == DepartReason::Stop {
        // §4.2: stop latched before Sailing aborts straight to Unloading.
        enter_unloading(shared).await;
        if !wait_until_onboard_zero(shared).await {
            return Ok(TripOutcome::Shutdown);
        }
        return Ok(TripOutcome::Completed(TripSummary {
            trip_no,
            direction,
            passengers: boarded_pax,
            bikes: boarded_bikes,
            left_bridge,
            aborted: true,
        }));
    }

    enter_sailing(shared).await;
    tokio::select! {
        _ = tokio::time::sleep(shared.config.t2) => {}
        _ = shared.shutdown.cancelled() => return Ok(TripOutcome::Shutdown),
    }

    enter_unloading(shared).await;
    if !wait_until_onboard_zero(shared).await {
        return Ok(TripOutcome::Shutdown);
    }

    Ok(TripOutcome::Completed(TripSummary {
        trip_no,
        direction,
        passengers: boarded_pax,
        bikes: boarded_bikes,
        left_bridge,
        aborted: false,
    }))
}

async fn start_trip(shared: &SharedRegion) {
    let mut guard = shared.lock().await;
    guard.trip_no += 1;
    guard.gangway_dir = crate::types::GangwayDirection::Idle;
    guard.phase = Phase::Loading;
    guard.boarding_open = true;
    shared.operator.reset_early_depart();
    guard.assert_invariants(&shared.config);
}

/// §4.2 "Wait for departure trigger". `None` means shutdown was observed.
async fn wait_for_departure_trigger(shared: &SharedRegion) -> Option<DepartReason> {
    let deadline = tokio::time::Instant::now() + shared.config.t1;
    loop {
        if shared.is_shutdown() {
            return None;
        }
        if shared.operator.stop_requested() {
            return Some(DepartReason::Stop);
        }
        if shared.operator.early_depart_requested() {
            return Some(DepartReason::EarlyDepart);
        }
        if tokio::time::Instant::now() >= deadline {
            return Some(DepartReason::Timer);
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => return None,
        }
    }
}

async fn close_boarding(shared: &SharedRegion) {
    let mut guard = shared.lock().await;
    guard.phase = Phase::Departing;
    guard.boarding_open = false;
    guard.gangway_dir = crate::types::GangwayDirection::Out;
    guard.assert_invariants(&shared.config);
}

async fn snapshot_boarding_stats(shared: &SharedRegion) -> (u32, u32) {
    let guard = shared.lock().await;
    (guard.onboard_pax, guard.onboard_bikes)
}

async fn enter_sailing(shared: &SharedRegion) {
    let mut guard = shared.lock().await;
    guard.phase = Phase::Sailing;
    guard.assert_invariants(&shared.config);
}

async fn enter_unloading(shared: &SharedRegion) {
    let mut guard = shared.lock().await;
    guard.phase = Phase::Unloading;
    guard.gangway_dir = crate::types::GangwayDirection::Out;
    guard.assert_invariants(&shared.config);
}

/// §4.2 "Clear gangway (LIFO evict)". `None` means shutdown cut the wait
/// for an `Ack` short.
async fn clear_gangway(
    shared: &SharedRegion,
    rx: &mut broadcast::Receiver<ControlMessage>,
) -> anyhow::Result<Option<u32>> {
    let mut evictions = 0u32;
    loop {
        let target = {
            let mut guard = shared.lock().await;
            match guard.gangway.mark_back_evicting() {
                None => {
                    reset_gangway_dir_if_empty(&mut guard);
                    return Ok(Some(evictions));
                }
                Some(entry) => entry,
            }
        };
        let trip_no = shared.lock().await.trip_no;
        shared.control.send_evict(target.actor_id, trip_no);
        shared.logger.record(
            ActorId::CAPTAIN,
            "evict",
            &format!("target={} trip={trip_no}", target.actor_id),
        );

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Ok(ControlMessage::Ack { actor, trip_no: ack_trip }) => {
                            if actor == target.actor_id && ack_trip == trip_no {
                                evictions += 1;
                                break;
                            }
                            warn!(
                                target: "ferry::captain",
                                expected = target.actor_id.0,
                                got = actor.0,
                                "protocol violation: unexpected ack, ignoring"
                            );
                            shared.logger.record(
                                ActorId::CAPTAIN,
                                "protocol-violation",
                                &format!("expected={} got={}", target.actor_id.0, actor.0),
                            );
                        }
                        Ok(ControlMessage::Evict { .. }) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => return Ok(Some(evictions)),
                    }
                }
                _ = shared.shutdown.cancelled() => return Ok(None),
            }
        }
    }
}

/// Returns `false` if shutdown was observed before `onboard_pax` hit zero.
async fn wait_until_onboard_zero(shared: &SharedRegion) -> bool {
    loop {
        {
            let guard = shared.lock().await;
            if guard.onboard_pax == 0 {
                return true;
            }
        }
        if shared.is_shutdown() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => return false,
        }
    }
}

#[cfg(test)]
#[path = "captain_tests.rs"]
mod tests;

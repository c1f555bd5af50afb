// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor (§4.5): builds the shared region, spawns the captain,
//! console, and every passenger, then reclaims everything on exit
//! regardless of how the run ended.
//!
//! REDESIGN (binding, see SPEC_FULL.md): every actor here is a `tokio`
//! task sharing `Arc<SharedRegion>`, not a forked OS process sharing POSIX
//! shared memory. "Reap children" becomes "await `JoinHandle`s"; "unlink
//! shared resources" becomes "drop the last `Arc` clone", which happens
//! automatically once every task handle completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::captain::{self, TripSummary};
use crate::config::{PassengerSpawn, SimConfig};
use crate::console::{self, OperatorEventSource};
use crate::log::Logger;
use crate::state::SharedRegion;
use crate::types::ActorId;

/// Everything the supervisor hands back once the run completes.
pub struct SimOutcome {
    pub summaries: Vec<TripSummary>,
}

/// Run one full simulation: spawn captain, console, and `passengers.len()`
/// passengers, then await completion. Returns once the captain reaches
/// `Phase::End` and every task has been joined.
pub async fn run(
    config: SimConfig,
    logger: Logger,
    passengers: Vec<PassengerSpawn>,
    event_source: impl OperatorEventSource + 'static,
) -> anyhow::Result<SimOutcome> {
    let shared = SharedRegion::new(config, logger);

    let signal_handle = spawn_signal_handler(Arc::clone(&shared));

    // Watchdog: the sender lives on this stack frame for the whole run. If
    // this function panics before the orderly join below, the sender is
    // dropped as the frame unwinds, the watchdog's receiver resolves to
    // `Err`, and every sibling task gets cancelled — the in-process
    // analogue of the source's forked watchdog tearing down the process
    // group when its pipe closes abnormally.
    let (watchdog_tx, watchdog_rx) = oneshot::channel::<()>();
    let watchdog_shutdown = Arc::clone(&shared);
    let watchdog: JoinHandle<()> = tokio::spawn(async move {
        if watchdog_rx.await.is_err() {
            warn!(target: "ferry::supervisor", "watchdog observed abnormal supervisor exit, forcing shutdown");
            watchdog_shutdown.set_shutdown();
        }
    });

    let captain_handle: JoinHandle<anyhow::Result<Vec<TripSummary>>> = {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move { captain::run_captain(shared).await })
    };

    let console_handle: JoinHandle<anyhow::Result<()>> = {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move { console::run_console(shared, event_source).await })
    };

    let mut passenger_handles = Vec::with_capacity(passengers.len());
    for (idx, spawn) in passengers.into_iter().enumerate() {
        let id = ActorId(idx as u32 + 1);
        let shared = Arc::clone(&shared);
        passenger_handles.push(tokio::spawn(async move {
            crate::passenger::run_passenger(id, shared, spawn).await
        }));
    }

    let summaries = match captain_handle.await {
        Ok(Ok(summaries)) => summaries,
        Ok(Err(e)) => {
            error!(target: "ferry::supervisor", error = %e, "captain exited with an error");
            shared.set_shutdown();
            shared.force_end().await;
            return Err(e);
        }
        Err(join_err) => {
            error!(target: "ferry::supervisor", error = %join_err, "captain task panicked");
            shared.set_shutdown();
            shared.force_end().await;
            return Err(anyhow::anyhow!("captain task panicked: {join_err}"));
        }
    };

    // The captain reaching End is the run's natural end; propagate it so
    // the console and any still-running passengers (shouldn't be any,
    // since the captain only reaches End once onboard_pax is zero or
    // shutdown was observed) wind down promptly.
    shared.set_shutdown();

    let join_timeout = config.shutdown_timeout;
    join_with_escalation(console_handle, join_timeout, "console").await;
    for handle in passenger_handles {
        join_with_escalation(handle, join_timeout, "passenger").await;
    }

    let _ = watchdog_tx.send(());
    let _ = watchdog.await;
    signal_handle.abort();

    info!(target: "ferry::supervisor", trips = summaries.len(), "simulation complete");
    debug_assert_eq!(
        Arc::strong_count(&shared),
        1,
        "a task handle outlived the supervisor's join — resources would leak"
    );

    Ok(SimOutcome { summaries })
}

/// Join a task within `budget`; past it, abort it outright rather than
/// leaving it running past the supervisor's own return (§4.5: "after it
/// elapses the supervisor escalates from cooperative cancellation to
/// aborting remaining task handles").
async fn join_with_escalation(mut handle: JoinHandle<anyhow::Result<()>>, budget: Duration, label: &str) {
    tokio::select! {
        res = &mut handle => {
            if let Err(join_err) = res {
                warn!(target: "ferry::supervisor", error = %join_err, label, "task panicked");
            }
        }
        _ = tokio::time::sleep(budget) => {
            warn!(target: "ferry::supervisor", label, "task exceeded shutdown budget, aborting");
            handle.abort();
            let _ = handle.await;
        }
    }
}

/// Operator-driven shutdown entry point: latches `shutdown`, forces
/// `phase = End, boarding_open = false` (§4.5), and lets the run loop
/// above observe it on its next poll.
pub fn request_shutdown(shared: &SharedRegion) {
    shared.set_shutdown();
}

/// SIGTERM/SIGINT handling, in the shape of the teacher's `run.rs` signal
/// task: the first signal latches shutdown cooperatively; a second one
/// (the operator losing patience with a slow drain) forces the process
/// down immediately rather than waiting out the join budget.
fn spawn_signal_handler(shared: Arc<SharedRegion>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = recv_or_pending(&mut sigterm) => info!(target: "ferry::supervisor", "received SIGTERM"),
            _ = recv_or_pending(&mut sigint) => info!(target: "ferry::supervisor", "received SIGINT"),
        }
        request_shutdown(&shared);

        tokio::select! {
            _ = recv_or_pending(&mut sigterm) => {
                warn!(target: "ferry::supervisor", "received SIGTERM again, forcing exit");
            }
            _ = recv_or_pending(&mut sigint) => {
                warn!(target: "ferry::supervisor", "received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    })
}

async fn recv_or_pending(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

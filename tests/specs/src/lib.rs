// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end harness for the ferry simulation.
//!
//! Drives `ferry::supervisor::run` directly in-process rather than
//! spawning a subprocess: there's no listening transport to dial into,
//! just a batch run that takes a config and a passenger manifest and
//! returns a trip-by-trip summary.

use std::time::Duration;

use ferry::config::{PassengerSpawn, SimConfig};
use ferry::console::ChannelEventSource;
use ferry::log::Logger;
use ferry::supervisor::SimOutcome;
use ferry::types::DesiredDirection;

/// Build a [`SimConfig`] from the scenario's named parameters (matches the
/// field names end-to-end scenarios are written against).
#[allow(clippy::too_many_arguments)]
pub fn scenario_config(
    n: u32,
    m: u32,
    k: u32,
    t1_ms: u64,
    t2_ms: u64,
    r: u32,
    give_up_ms: u64,
) -> SimConfig {
    SimConfig {
        n,
        m,
        k,
        t1: Duration::from_millis(t1_ms),
        t2: Duration::from_millis(t2_ms),
        r,
        give_up: Duration::from_millis(give_up_ms),
        shutdown_timeout: Duration::from_millis(2000),
    }
}

/// `count` passengers, all desiring the same direction, with a uniform
/// bike decision. Scenarios that want a mixed manifest build the `Vec`
/// directly instead of using this helper.
pub fn uniform_passengers(count: u32, desired_dir: DesiredDirection, has_bike: bool) -> Vec<PassengerSpawn> {
    (0..count).map(|_| PassengerSpawn { desired_dir, has_bike }).collect()
}

/// A scenario run still in flight, with a sender for operator tokens and
/// the join handle for the background task driving it to completion.
pub struct ScenarioRun {
    tx: std::sync::mpsc::Sender<char>,
    handle: tokio::task::JoinHandle<anyhow::Result<SimOutcome>>,
}

impl ScenarioRun {
    /// Start a run in the background so the test can inject operator
    /// events (`send_early_depart`/`send_stop`) partway through.
    pub fn spawn(config: SimConfig, passengers: Vec<PassengerSpawn>) -> Self {
        let (tx, source) = ChannelEventSource::new();
        let handle = tokio::spawn(ferry::supervisor::run(config, Logger::disabled(), passengers, source));
        Self { tx, handle }
    }

    /// Send the early-depart token (`'1'`) after `delay`.
    pub async fn send_early_depart_after(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
        let _ = self.tx.send('1');
    }

    /// Send the stop token (`'2'`) after `delay`.
    pub async fn send_stop_after(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
        let _ = self.tx.send('2');
    }

    /// Await completion, bounded so a stuck run fails the test instead of
    /// hanging the suite.
    pub async fn finish(self, timeout: Duration) -> anyhow::Result<SimOutcome> {
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(join_result) => join_result.expect("scenario task panicked"),
            Err(_) => anyhow::bail!("scenario did not finish within {timeout:?}"),
        }
    }
}

/// Run a scenario to completion with no operator intervention, bounded by
/// `timeout`.
pub async fn run_scenario(
    config: SimConfig,
    passengers: Vec<PassengerSpawn>,
    timeout: Duration,
) -> anyhow::Result<SimOutcome> {
    ScenarioRun::spawn(config, passengers).finish(timeout).await
}

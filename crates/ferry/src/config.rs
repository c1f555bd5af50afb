// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use crate::types::DesiredDirection;

/// Upper bound on gangway capacity accepted at the command line (§6).
pub const K_MAX: u32 = 4096;
/// Upper bound on passenger count accepted at the command line (§6).
pub const P_MAX: u32 = 100_000;

/// Ferry shuttle simulation: a bounded-capacity ferry, a captain, an
/// operator console, and P independent passengers.
#[derive(Debug, Parser)]
#[command(name = "ferry", version, about)]
pub struct Config {
    /// Total number of passenger actors to spawn (N).
    #[arg(long, env = "FERRY_N")]
    pub n: u32,

    /// Maximum bicycles allowed onboard at once (M).
    #[arg(long, env = "FERRY_M")]
    pub m: u32,

    /// Gangway capacity, in units (K).
    #[arg(long, env = "FERRY_K")]
    pub k: u32,

    /// Boarding duration in milliseconds (T1).
    #[arg(long, env = "FERRY_T1")]
    pub t1_ms: u64,

    /// Sailing duration in milliseconds (T2).
    #[arg(long, env = "FERRY_T2")]
    pub t2_ms: u64,

    /// Number of trips to run before terminating (R).
    #[arg(long, env = "FERRY_R")]
    pub r: u32,

    /// Number of passenger actors to spawn (P). Independent of N: P
    /// passengers compete for N seats.
    #[arg(long, env = "FERRY_P")]
    pub p: u32,

    /// Probability, in [0.0, 1.0], that a spawned passenger wants a bike.
    #[arg(long, env = "FERRY_BIKE_PROB", default_value = "0.3")]
    pub bike_prob: f64,

    /// Append-only text log path. Omit to disable file logging.
    #[arg(long, env = "FERRY_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Passenger give-up timer, in milliseconds, before boarding.
    #[arg(long, env = "FERRY_GIVE_UP_MS", default_value = "15000")]
    pub give_up_ms: u64,

    /// Wall-clock budget, in milliseconds, for supervisor shutdown before
    /// escalating from cooperative cancellation to aborting tasks.
    #[arg(long, env = "FERRY_SHUTDOWN_TIMEOUT_MS", default_value = "5000")]
    pub shutdown_timeout_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "FERRY_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "FERRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate parameters per §6. Returns `SimError::Config` describing
    /// the first violation found.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.n == 0 {
            anyhow::bail!("N must be > 0");
        }
        if self.m >= self.n {
            anyhow::bail!("M must be < N (0 <= M < N)");
        }
        if self.k == 0 || self.k >= self.n {
            anyhow::bail!("K must satisfy 0 < K < N");
        }
        if self.k > K_MAX {
            anyhow::bail!("K must be <= {K_MAX}");
        }
        if self.t1_ms == 0 {
            anyhow::bail!("T1 must be > 0");
        }
        if self.t2_ms == 0 {
            anyhow::bail!("T2 must be > 0");
        }
        if self.r == 0 {
            anyhow::bail!("R must be > 0");
        }
        if self.p > P_MAX {
            anyhow::bail!("P must be <= {P_MAX}");
        }
        if !(0.0..=1.0).contains(&self.bike_prob) {
            anyhow::bail!("bike-prob must be in [0.0, 1.0]");
        }
        Ok(())
    }

    pub fn as_sim_config(&self) -> SimConfig {
        SimConfig {
            n: self.n,
            m: self.m,
            k: self.k,
            t1: std::time::Duration::from_millis(self.t1_ms),
            t2: std::time::Duration::from_millis(self.t2_ms),
            r: self.r,
            give_up: std::time::Duration::from_millis(self.give_up_ms),
            shutdown_timeout: std::time::Duration::from_millis(self.shutdown_timeout_ms),
        }
    }
}

/// Immutable-after-init simulation parameters (§3 `config`), decoupled
/// from `clap::Config` so library callers (tests) can build one without
/// going through argv parsing.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub n: u32,
    pub m: u32,
    pub k: u32,
    pub t1: std::time::Duration,
    pub t2: std::time::Duration,
    pub r: u32,
    pub give_up: std::time::Duration,
    pub shutdown_timeout: std::time::Duration,
}

/// Per-passenger spawn parameters (§4.5: "a deterministically or randomly
/// chosen direction and a per-passenger bicycle decision sampled from the
/// configured probability").
#[derive(Debug, Clone, Copy)]
pub struct PassengerSpawn {
    pub desired_dir: DesiredDirection,
    pub has_bike: bool,
}

/// Sample `p` passenger spawn descriptors: direction is an even coin flip
/// (the source leaves the distribution to the implementer — see
/// DESIGN.md), bike ownership is sampled from `bike_prob`.
pub fn sample_passengers(p: u32, bike_prob: f64, rng: &mut impl rand::Rng) -> Vec<PassengerSpawn> {
    (0..p)
        .map(|_| {
            let desired_dir =
                if rng.random_bool(0.5) { DesiredDirection::AtoB } else { DesiredDirection::BtoA };
            let has_bike = rng.random_bool(bike_prob);
            PassengerSpawn { desired_dir, has_bike }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

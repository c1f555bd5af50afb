// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Domain error kinds for the ferry simulation.
///
/// Mirrors the source specification's error taxonomy 1:1 so each variant's
/// propagation rule (retry, orderly exit, abort) stays traceable to §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Invalid or missing startup parameters. Fatal at the supervisor.
    Config(String),
    /// A shared resource (semaphore, channel, log file, mutex) could not be
    /// created or was found poisoned. Fatal at the discovering actor.
    Resource(String),
    /// A blocking call observed a lagged broadcast receiver or lost a
    /// `tokio::select!` race to cancellation. Recovered locally by retry.
    TransientInterruption,
    /// The gangway ring would exceed its fixed capacity.
    CapacityExceeded,
    /// An `Ack` whose actor id did not match the expected target.
    ProtocolViolation { expected: u32, actual: u32 },
    /// Passenger give-up timer expired before boarding. Not a failure.
    Deadline,
}

impl SimError {
    /// Process exit code per §6: 0 normal, 1 resource/IO, 2 bad config.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Resource(msg) => write!(f, "resource error: {msg}"),
            Self::TransientInterruption => write!(f, "transient interruption"),
            Self::CapacityExceeded => write!(f, "gangway capacity exceeded"),
            Self::ProtocolViolation { expected, actual } => {
                write!(f, "protocol violation: expected ack from actor {expected}, got {actual}")
            }
            Self::Deadline => write!(f, "give-up timer expired before boarding"),
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

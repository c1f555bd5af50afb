// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only text log for domain events (§6 "log sink" collaborator),
//! kept separate from `tracing`'s operational/diagnostic stream — this is
//! the simulation's own record of what each actor did, one line per
//! record, serialized with a plain `std::sync::Mutex` since writes are
//! synchronous and short (no `.await` is ever taken while holding it, per
//! §5's locking discipline).
//!
//! In the shape of `event_log.rs`'s file-backed sink, adapted from JSONL
//! records to free-form text lines.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::ActorId;

fn monotonic_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Append-only text log. If constructed with `path = None` (the default
/// for in-process tests), records are dropped rather than written —
/// mirroring `EventLog::new`'s "no session_dir, no files written".
pub struct Logger {
    path: Option<PathBuf>,
    file: Option<Mutex<std::fs::File>>,
    seq: AtomicU64,
}

impl Logger {
    pub fn new(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let file = match &path {
            Some(p) => {
                let f = std::fs::OpenOptions::new().create(true).append(true).open(p)?;
                Some(Mutex::new(f))
            }
            None => None,
        };
        Ok(Self { path, file, seq: AtomicU64::new(0) })
    }

    /// No-op logger for contexts that don't want a log file (most tests).
    pub fn disabled() -> Self {
        Self { path: None, file: None, seq: AtomicU64::new(0) }
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    /// Append one record: `<seq> <timestamp_ms> <actor> <role> <body>`.
    pub fn record(&self, actor: ActorId, role: &str, body: &str) {
        let Some(file) = &self.file else { return };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let line = format!("{seq} {} {actor} {role} {body}\n", monotonic_ms());
        if let Ok(mut f) = file.lock() {
            let _ = f.write_all(line.as_bytes());
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;

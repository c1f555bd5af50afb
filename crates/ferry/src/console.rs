// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator console (§4.4): turns an abstracted operator event stream
//! into the two notifications the captain reads — *early-depart* and
//! *stop*. Abstracted behind [`OperatorEventSource`] so tests can inject
//! events without a real terminal; the real binary reads stdin lines on a
//! background thread.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::state::SharedRegion;
use crate::types::Phase;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A source of operator event tokens. `'1'` means early-depart, `'2'`
/// means stop; everything else is ignored (§6).
pub trait OperatorEventSource: Send {
    /// Non-blocking: `None` means nothing is waiting right now.
    fn try_next(&mut self) -> Option<char>;
}

/// Reads single characters from a background thread draining stdin, so the
/// console can poll with a short timeout instead of blocking the runtime
/// on a line read (§4.4: "must not block indefinitely on the input
/// stream").
pub struct StdinEventSource {
    rx: mpsc::Receiver<char>,
}

impl StdinEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            use std::io::Read;
            let mut stdin = std::io::stdin();
            let mut byte = [0u8; 1];
            loop {
                match stdin.read(&mut byte) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(byte[0] as char).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        Self { rx }
    }
}

impl Default for StdinEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorEventSource for StdinEventSource {
    fn try_next(&mut self) -> Option<char> {
        self.rx.try_recv().ok()
    }
}

/// Event source backed by a channel the test harness feeds directly.
pub struct ChannelEventSource {
    rx: mpsc::Receiver<char>,
}

impl ChannelEventSource {
    pub fn new() -> (mpsc::Sender<char>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl OperatorEventSource for ChannelEventSource {
    fn try_next(&mut self) -> Option<char> {
        self.rx.try_recv().ok()
    }
}

/// Run the console until `phase = End`, `shutdown`, or the event source is
/// exhausted.
pub async fn run_console(shared: Arc<SharedRegion>, mut source: impl OperatorEventSource) -> anyhow::Result<()> {
    // Wait for the captain to publish its id before reacting to events —
    // matches §4.5's "additionally receives the captain's ActorId (read
    // from shared state, published at startup)".
    loop {
        if shared.lock().await.captain_id.is_some() {
            break;
        }
        if shared.is_shutdown() {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    loop {
        let snapshot = shared.snapshot().await;
        if snapshot.shutdown || snapshot.phase == Phase::End {
            return Ok(());
        }

        match source.try_next() {
            Some('1') => {
                shared.operator.request_early_depart();
                info!(target: "ferry::console", "operator requested early-depart");
                shared.logger.record(crate::types::ActorId::CAPTAIN, "console", "early-depart");
            }
            Some('2') => {
                shared.operator.request_stop();
                info!(target: "ferry::console", "operator requested stop");
                shared.logger.record(crate::types::ActorId::CAPTAIN, "console", "stop");
            }
            Some(_) => {}
            None => {}
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shared.shutdown.cancelled() => return Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;

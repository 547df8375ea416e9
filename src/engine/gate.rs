// src/engine/gate.rs

//! One-shot readiness / completion gate.

use tokio::sync::watch;

/// A single-assignment signal shared between the control task and the
/// watcher tasks of one process.
///
/// Whichever event fires first (watch text or natural process exit) opens
/// the gate; opening it again is a no-op. Clones observe the same gate.
#[derive(Debug, Clone)]
pub struct SignalGate {
    tx: watch::Sender<bool>,
}

impl SignalGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Open the gate. Returns `true` only for the call that actually opened
    /// it.
    pub fn release(&self) -> bool {
        self.tx.send_if_modified(|open| {
            if *open {
                false
            } else {
                *open = true;
                true
            }
        })
    }

    pub fn is_released(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate is open. Returns immediately if it already is.
    pub async fn released(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we
        // wait.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for SignalGate {
    fn default() -> Self {
        Self::new()
    }
}

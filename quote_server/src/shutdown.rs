//! Process-wide shutdown signal.
//!
//! The signal is a crossbeam channel that never carries a message: dropping the
//! single `ShutdownTrigger` disconnects every cloned `Shutdown` receiver at once,
//! so any loop blocked in `select!` on it wakes up immediately.
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use std::time::Duration;

/// Owner side of the signal. Dropping it (or calling `trigger`) stops every loop.
pub struct ShutdownTrigger {
    _tx: Sender<()>,
}

impl ShutdownTrigger {
    /// Fire the signal.
    pub fn trigger(self) {}
}

/// Cloneable observer side of the signal.
#[derive(Clone)]
pub struct Shutdown {
    rx: Receiver<()>,
}

impl Shutdown {
    /// Create a connected trigger/observer pair.
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = bounded(0);
        (ShutdownTrigger { _tx: tx }, Shutdown { rx })
    }

    /// Non-blocking check.
    pub fn is_triggered(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep for `timeout` unless shutdown fires first. Returns `true` on shutdown.
    pub fn wait(&self, timeout: Duration) -> bool {
        select! {
            recv(self.rx) -> _ => true,
            default(timeout) => false,
        }
    }

    /// Raw receiver for use as a `select!` arm.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

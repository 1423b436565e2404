//! Cooperative cancellation for a running campaign
//!
//! The orchestrator checks the signal between probes and races it against every
//! suspension point (server warmup, monitoring wait).

use std::time::Duration;
use tokio::sync::watch;

/// Raises the cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already; nothing left to stop then
        let _ = self.tx.send(true);
    }
}

/// Observes the cancellation signal; cheap to clone
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelSignal {
    /// A signal that is never raised
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised; pends forever if it never can be
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration`; returns false if cancelled first
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

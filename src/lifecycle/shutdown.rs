//! Graceful shutdown signaling.
//!
//! A single [`Shutdown`] handle lives in `main`; the HTTP server and any
//! background tasks hold receivers. Triggering fans out to every subscriber
//! at once, so in-flight requests drain instead of being cut off.

use tokio::sync::broadcast;

/// Broadcast handle that tells long-running tasks to stop.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Obtain a receiver for a task that should stop on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Receivers that arrive later miss the
    /// signal, so subscribe before spawning the task.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

//! Debounce primitive: coalesce a burst of trigger signals into one delayed
//! firing.
//!
//! The first trigger opens a coalescing window; triggers arriving inside the
//! window are absorbed; when the window closes exactly one signal is emitted.
//! A quiet debouncer consumes nothing.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Signal emitted when a coalescing window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fire;

/// Cloneable trigger handle. Dropping every clone stops the worker task.
#[derive(Debug, Clone)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Spawn the debounce worker. Must be called within a tokio runtime.
    pub fn spawn(window: Duration) -> (Self, broadcast::Receiver<Fire>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let (out, out_rx) = broadcast::channel::<Fire>(16);

        tokio::spawn(async move {
            // Each iteration: wait for one trigger, absorb the burst, fire once.
            while rx.recv().await.is_some() {
                tokio::time::sleep(window).await;
                while rx.try_recv().is_ok() {}
                if out.send(Fire).is_err() {
                    // All subscribers gone; keep draining triggers anyway so
                    // senders never block, until the channel itself closes.
                    continue;
                }
            }
        });

        (Self { tx }, out_rx)
    }

    /// Record one trigger. Cheap, non-blocking, callable from any thread.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

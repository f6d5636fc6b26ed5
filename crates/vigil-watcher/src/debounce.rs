//! Event debouncing.
//!
//! Bursts of lifecycle events (a compose stack going up creates dozens
//! of containers in a second) collapse into a single rescan: each signal
//! restarts a quiet window, and only when the window elapses untouched
//! does one notification fire.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

/// Sending half: signal that an event arrived.
#[derive(Clone)]
pub struct DebounceHandle {
    tx: mpsc::Sender<()>,
}

impl DebounceHandle {
    /// Records one event. Saturation is fine: a pending signal already
    /// guarantees the window restarts.
    pub fn signal(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Creates a debouncer with the given quiet window.
///
/// Returns the signaling handle and the receiver that yields exactly one
/// `()` per burst. Dropping every handle stops the background task.
#[must_use]
pub fn debouncer(window: Duration) -> (DebounceHandle, mpsc::Receiver<()>) {
    let (signal_tx, mut signal_rx) = mpsc::channel::<()>(16);
    let (fire_tx, fire_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        // Outer loop: wait for the first signal of a burst.
        while signal_rx.recv().await.is_some() {
            // Inner loop: every further signal restarts the quiet window.
            loop {
                match timeout(window, signal_rx.recv()).await {
                    Ok(Some(())) => {}
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            if fire_tx.send(()).await.is_err() {
                return;
            }
        }
    });

    (DebounceHandle { tx: signal_tx }, fire_rx)
}

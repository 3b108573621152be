//! Client-disconnect signalling.
//!
//! Each request envelope carries an [`AbortSignal`]; the host adapter
//! keeps the paired [`AbortHandle`] and fires it when the client goes
//! away. Streaming response producers select against the signal so
//! that their timers and buffers are torn down promptly instead of
//! running to completion against a dead connection.

use tokio::sync::watch;

/// Create a linked abort pair.
///
/// The handle side is held by whoever owns the connection; the signal
/// side is cloned freely into contexts and producer tasks.
#[must_use]
pub fn abort_channel() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: std::sync::Arc::new(tx) }, AbortSignal { rx })
}

/// Fires the abort signal for one request.
///
/// Cloning yields another handle to the same request; firing any clone
/// aborts them all. Dropping every handle without firing leaves the
/// request un-aborted forever, which is the normal completion path.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Mark the request as aborted. Idempotent.
    pub fn abort(&self) {
        // Receivers may all be gone already; that is fine.
        let _ = self.tx.send(true);
    }

    /// Whether the signal has already been fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observes whether the request has been aborted.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Whether the request has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the request is aborted.
    ///
    /// If every [`AbortHandle`] is dropped without firing, the future
    /// never resolves; callers race it against their own work with
    /// `select!` rather than awaiting it alone.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        // Sender dropped without ever firing: this request can no
        // longer be aborted.
        std::future::pending::<()>().await;
    }
}

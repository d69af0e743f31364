//! Stopping a run early, by deadline or on request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Requests cancellation of every run holding a [`RunControl`] made from it.
///
/// Cancelling is idempotent and works whether or not a run is listening yet.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Limits on how long a run may keep fetching.
///
/// The default control never stops a run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop fetching once `run_timeout` has elapsed from now.
    pub fn with_timeout(mut self, run_timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + run_timeout);
        self
    }

    /// Stop fetching once `handle` is cancelled.
    pub fn with_cancel(mut self, handle: &CancelHandle) -> Self {
        self.cancel = Some(handle.tx.subscribe());
        self
    }

    /// Whether the deadline has passed or cancellation was requested.
    pub fn is_stopped(&self) -> bool {
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        let cancelled = self.cancel.as_ref().is_some_and(|rx| *rx.borrow());
        expired || cancelled
    }

    /// Resolves when the run should stop. Pending forever for the default control.
    pub async fn stopped(&self) {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        let cancelled = async {
            let Some(mut rx) = self.cancel.clone() else {
                return std::future::pending::<()>().await;
            };
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                // All handles dropped without cancelling.
                if rx.changed().await.is_err() {
                    return std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = deadline => {}
            _ = cancelled => {}
        }
    }

    /// Run `fut` unless the run stops first, in which case `fut` is dropped.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_stopped() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.stopped() => None,
            out = fut => Some(out),
        }
    }
}

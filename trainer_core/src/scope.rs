//! Cancellation tied to a view's lifetime.
//!
//! A screen opens a [`ViewScope`] and runs its gateway calls through it.
//! Once the scope is closed, results that arrive late are dropped instead
//! of being applied to a view that is gone.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct ViewScope {
    closed: Arc<watch::Sender<bool>>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            closed: Arc::new(closed),
        }
    }

    /// Close the scope. Pending and future `run` calls resolve to `None`.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves when the scope is closed
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so this only fails if it was dropped
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Drive `fut` unless the scope closes first
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_closed() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.closed() => {
                tracing::debug!("View scope closed, dropping pending result");
                None
            }
            out = fut => {
                if self.is_closed() {
                    None
                } else {
                    Some(out)
                }
            }
        }
    }
}

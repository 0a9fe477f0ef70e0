//! Fire-and-forget background writes.
//!
//! Tasks run on their own tokio task, detached from the request that spawned
//! them: dropping or cancelling the request future does not cancel the write.
//! Nothing retries a failed task and no caller ever sees its error; failures
//! are logged as [`Error::Persistence`]. A semaphore bounds how many writes run
//! at once. `drain` lets a process wait for outstanding writes before exit.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, Semaphore};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Background {
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

/// Decrements the pending count even if the task panics.
struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl Background {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Run `task` in the background. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            idle: Arc::clone(&self.idle),
        };
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _guard = guard;
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await;

            match task.await {
                Ok(()) => tracing::debug!("Background task {} done", name),
                Err(e) => {
                    let err = Error::Persistence {
                        task: name,
                        source: Box::new(e),
                    };
                    tracing::warn!("{}", err);
                }
            }
        });
    }

    /// Tasks spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every spawned task has finished.
    pub async fn drain(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

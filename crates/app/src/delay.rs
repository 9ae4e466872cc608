//! Delayed task execution on a tokio runtime.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::ports::{DelayHandle, DelayScheduler, DelayedTask};

/// [`DelayScheduler`] spawning one timer task per scheduled job.
///
/// The task body runs on tokio's blocking pool, since effects perform
/// synchronous device and store calls.
#[derive(Debug, Clone)]
pub struct TokioDelayScheduler {
    runtime: Handle,
}

impl TokioDelayScheduler {
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler bound to the runtime of the calling context, if any.
    #[must_use]
    pub fn from_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl DelayScheduler for TokioDelayScheduler {
    fn schedule(&self, delay: Duration, task: DelayedTask) -> DelayHandle {
        let handle = DelayHandle::new();
        let guard = handle.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !guard.begin() {
                tracing::debug!(?delay, "delayed task cancelled");
                return;
            }
            if let Err(err) = tokio::task::spawn_blocking(task).await {
                tracing::error!(error = %err, "delayed task panicked");
            }
        });
        handle
    }
}

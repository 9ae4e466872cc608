//! Delay port — run a task once after a delay, with cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Work scheduled for later.
pub type DelayedTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules delayed one-shot tasks.
pub trait DelayScheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, task: DelayedTask) -> DelayHandle;
}

impl<T: DelayScheduler + ?Sized> DelayScheduler for Arc<T> {
    fn schedule(&self, delay: Duration, task: DelayedTask) -> DelayHandle {
        (**self).schedule(delay, task)
    }
}

const PENDING: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared state of one scheduled task.
///
/// The scheduler calls [`DelayHandle::begin`] when the delay elapses and
/// only runs the task if it wins against [`DelayHandle::cancel`].
#[derive(Debug, Clone, Default)]
pub struct DelayHandle {
    state: Arc<AtomicU8>,
}

impl DelayHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevent the task from starting. Returns `false` if it already started
    /// or was cancelled before.
    pub fn cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    /// Claim the right to run the task. Returns `false` if it was cancelled.
    pub fn begin(&self) -> bool {
        self.transition(STARTED)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

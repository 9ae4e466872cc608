//! In-process synchronous event bus.
//!
//! [`EventBus::dispatch`] delivers an event to every registered handler, in
//! registration order, on the calling thread. A handler may dispatch again
//! from inside its own invocation; other threads block until the outermost
//! dispatch of the current thread returns.
//!
//! Handlers added or removed while a dispatch is running are queued and only
//! applied once the outermost dispatch finishes: a handler added during
//! dispatch is not invoked by it, and a handler removed during dispatch still
//! sees the rest of it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use hearth_domain::dispatch::DispatchResult;
use hearth_domain::event::Event;

/// Receives events from an [`EventBus`].
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &Event) -> DispatchResult;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> DispatchResult + Send + Sync,
{
    fn handle_event(&self, event: &Event) -> DispatchResult {
        self(event)
    }
}

/// Token identifying a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Registered = (HandlerId, Arc<dyn EventHandler>);

#[derive(Default)]
struct BusState {
    handlers: Vec<Registered>,
    pending_add: Vec<Registered>,
    pending_remove: Vec<HandlerId>,
    depth: usize,
}

/// Thread-safe, re-entrant publish/dispatch bus.
#[derive(Default)]
pub struct EventBus {
    gate: ReentrantGate,
    state: Mutex<BusState>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; deferred while a dispatch is in progress.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _gate = self.gate.enter();
        let mut state = self.lock_state();
        if state.depth > 0 {
            state.pending_add.push((id, handler));
        } else {
            state.handlers.push((id, handler));
        }
        id
    }

    /// Unregister a handler; deferred while a dispatch is in progress.
    ///
    /// Unknown ids are logged and otherwise ignored. Deferred removals are
    /// applied before deferred additions, so a handler both added and removed
    /// during the same dispatch stays registered once it ends.
    pub fn remove_handler(&self, id: HandlerId) {
        let _gate = self.gate.enter();
        let mut state = self.lock_state();
        if state.depth > 0 {
            tracing::warn!(
                ?id,
                "removing event handler inside dispatch, prefer returning SHOULD_REMOVE"
            );
            state.pending_remove.push(id);
        } else if let Some(pos) = state.handlers.iter().position(|(h, _)| *h == id) {
            state.handlers.remove(pos);
        } else {
            tracing::warn!(?id, "tried to remove an event handler which does not exist");
        }
    }

    /// Number of active handlers (pending additions excluded).
    #[must_use]
    pub fn handler_count(&self) -> usize {
        let _gate = self.gate.enter();
        self.lock_state().handlers.len()
    }

    /// Deliver `event` to the registered handlers.
    ///
    /// Returns the union of the handler results. A panicking handler is
    /// logged and reported as [`DispatchResult::ERROR`]; the remaining
    /// handlers still run.
    pub fn dispatch(&self, event: &Event) -> DispatchResult {
        let _gate = self.gate.enter();
        let event_type = event.event_type();
        tracing::debug!(%event_type, "handling event");

        let handlers = {
            let mut state = self.lock_state();
            state.depth += 1;
            state.handlers.clone()
        };

        let mut combined = DispatchResult::NOT_HANDLED;
        for (id, handler) in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler.handle_event(event)))
                .unwrap_or_else(|panic| {
                    tracing::error!(
                        %event_type,
                        ?id,
                        message = panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                    DispatchResult::ERROR
                });
            combined |= result;
            if result.should_remove() {
                self.lock_state().pending_remove.push(id);
            }
            if result.is_consumed() {
                break;
            }
        }

        if !combined.is_handled() {
            tracing::debug!(%event_type, "unhandled event");
        }

        let mut state = self.lock_state();
        state.depth -= 1;
        if state.depth == 0 {
            let removed = std::mem::take(&mut state.pending_remove);
            state.handlers.retain(|(id, _)| !removed.contains(id));
            let added = std::mem::take(&mut state.pending_add);
            state.handlers.extend(added);
        }
        combined
    }

    fn lock_state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Lock that the owning thread may enter recursively.
#[derive(Default)]
struct ReentrantGate {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

struct GateGuard<'a> {
    gate: &'a ReentrantGate,
}

impl ReentrantGate {
    fn enter(&self) -> GateGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((id, depth)) if id == me => {
                    *owner = Some((me, depth + 1));
                    break;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        GateGuard { gate: self }
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self
            .gate
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *owner {
            Some((id, depth)) if depth > 1 => *owner = Some((id, depth - 1)),
            _ => {
                *owner = None;
                self.gate.released.notify_one();
            }
        }
    }
}

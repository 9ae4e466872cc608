//! Statically typed event channel.
//!
//! [`TypedEmitter`] is the lightweight sibling of
//! [`EventBus`](crate::event_bus::EventBus): one concrete event type, an
//! optional context value passed alongside it, and the same
//! [`DispatchResult`] semantics.
//!
//! It performs no locking and offers no re-entrancy. The owner must
//! serialize access (for example by keeping it behind the same mutex as the
//! resource whose changes it announces) and must not emit on a channel from
//! inside one of its own handlers.

use std::fmt;

use hearth_domain::dispatch::DispatchResult;

type Handler<E, C> = Box<dyn FnMut(&E, &C) -> DispatchResult + Send>;

/// Ordered list of handlers for events of type `E` with context `C`.
pub struct TypedEmitter<E, C = ()> {
    handlers: Vec<Handler<E, C>>,
}

impl<E, C> Default for TypedEmitter<E, C> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E, C> fmt::Debug for TypedEmitter<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEmitter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<E, C> TypedEmitter<E, C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&E, &C) -> DispatchResult + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke handlers in order until one consumes the event.
    ///
    /// Handlers returning [`DispatchResult::SHOULD_REMOVE`] are dropped
    /// during the pass. Returns the union of the handler results.
    pub fn emit(&mut self, event: &E, context: &C) -> DispatchResult {
        let mut combined = DispatchResult::NOT_HANDLED;
        let mut index = 0;
        while index < self.handlers.len() {
            let result = (self.handlers[index])(event, context);
            combined |= result;
            if result.should_remove() {
                self.handlers.remove(index);
            } else {
                index += 1;
            }
            if result.is_consumed() {
                break;
            }
        }
        combined
    }
}

//! Result flags returned by event handlers.

bitflags::bitflags! {
    /// Outcome of a single handler invocation.
    ///
    /// `CONSUME_EVENT` stops delivery to the handlers registered after the
    /// one that returned it. `SHOULD_REMOVE` schedules the handler for removal
    /// once the current dispatch completes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DispatchResult: u8 {
        const HANDLED = 1;
        const SHOULD_REMOVE = 1 << 1;
        const ERROR = 1 << 2;
        const CONSUME_EVENT = 1 << 3;
    }
}

impl DispatchResult {
    /// The handler ignored the event.
    pub const NOT_HANDLED: Self = Self::empty();

    #[must_use]
    pub const fn is_handled(self) -> bool {
        self.contains(Self::HANDLED)
    }

    #[must_use]
    pub const fn should_remove(self) -> bool {
        self.contains(Self::SHOULD_REMOVE)
    }

    #[must_use]
    pub const fn is_consumed(self) -> bool {
        self.contains(Self::CONSUME_EVENT)
    }
}

impl Default for DispatchResult {
    fn default() -> Self {
        Self::NOT_HANDLED
    }
}

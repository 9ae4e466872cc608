//! # hearth-app
//!
//! Application layer — port definitions (traits) and the automation core.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ActionStore` — lookup of stored actions
//!   - `RuleStore` — filtered listing of stored rules
//!   - `DeviceRegistry` — device snapshots and property writes
//!   - `NotificationChannel` — broadcast to connected clients
//!   - `DelayScheduler` — cancellable delayed tasks
//! - Provide **in-process infrastructure** that doesn't need IO:
//!   - `EventBus` — re-entrant synchronous dispatch of domain events
//!   - `TypedEmitter` — lock-free typed channel for scoped change events
//!   - `BroadcastNotifier`, `TokioDelayScheduler` — tokio-backed port implementations
//! - Run automations:
//!   - `ActionExecutor` — executes actions and their sub-actions
//!   - `RuleScheduler` — time-driven and event-driven rule firing
//!
//! ## Dependency rule
//! Depends on `hearth-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod delay;
pub mod emitter;
pub mod event_bus;
pub mod executor;
pub mod notifier;
pub mod ports;
pub mod rule_scheduler;

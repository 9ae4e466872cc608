//! # hearth-adapter-memory
//!
//! In-memory storage adapter implementing the `ActionStore` and `RuleStore`
//! ports.
//!
//! Each store owns a [`TypedEmitter`](hearth_app::emitter::TypedEmitter)
//! change channel; the daemon subscribes to it and forwards the change events
//! to the event bus. Stores can be pre-filled from a JSON seed document.
//!
//! ## Dependency rule
//!
//! Depends on `hearth-app` (port traits) and `hearth-domain` only.

mod action_store;
mod error;
mod rule_store;
mod seed;
mod table;

pub use action_store::InMemoryActionStore;
pub use error::MemoryStoreError;
pub use rule_store::InMemoryRuleStore;
pub use seed::{SeedSummary, load_seed};

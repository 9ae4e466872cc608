//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.
//!
//! Rule evaluation and action execution run synchronously inside event
//! dispatch, so every port here is a plain blocking trait.

pub mod action_store;
pub mod delay;
pub mod device_registry;
pub mod notification;
pub mod rule_store;

pub use action_store::ActionStore;
pub use delay::{DelayHandle, DelayScheduler, DelayedTask};
pub use device_registry::{DeviceRegistry, RegistryDeviceState};
pub use notification::NotificationChannel;
pub use rule_store::{RuleFilter, RuleStore};

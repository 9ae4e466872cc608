//! Sub-action — one step of an [`Action`](super::Action).

use std::fmt;
use std::time::Duration;

use crate::id::{ActionId, DeviceId};

/// The effect a sub-action performs.
#[derive(Debug, Clone, PartialEq)]
pub enum SubActionKind {
    /// Write `value` to a device property.
    DeviceSet {
        device_id: DeviceId,
        property: String,
        value: serde_json::Value,
    },
    /// Flip a boolean property, or toggle an integer property between 0 and 1.
    DeviceToggle {
        device_id: DeviceId,
        property: String,
    },
    /// Broadcast a message on the notification channel.
    Notification { category: i32, message: String },
    /// Execute another stored action.
    RecursiveAction { action_id: ActionId },
}

impl fmt::Display for SubActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceSet {
                device_id,
                property,
                value,
            } => write!(f, "device_set({device_id}.{property} = {value})"),
            Self::DeviceToggle {
                device_id,
                property,
            } => write!(f, "device_toggle({device_id}.{property})"),
            Self::Notification { category, message } => {
                write!(f, "notification({category}, {message:?})")
            }
            Self::RecursiveAction { action_id } => write!(f, "recursive_action({action_id})"),
        }
    }
}

/// Concrete implementation behind a [`SubAction`].
///
/// Carries the type code it was registered under, so encoding and decoding
/// agree with the [`SubActionRegistry`](super::SubActionRegistry) that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubActionImpl {
    type_code: u64,
    pub timeout: Duration,
    pub transition: bool,
    pub kind: SubActionKind,
}

impl SubActionImpl {
    pub const DEVICE_SET: u64 = 0;
    pub const DEVICE_TOGGLE: u64 = 1;
    pub const NOTIFICATION: u64 = 2;
    pub const RECURSIVE_ACTION: u64 = 5;

    /// Create an implementation with no timeout and no transition.
    #[must_use]
    pub fn new(type_code: u64, kind: SubActionKind) -> Self {
        Self {
            type_code,
            timeout: Duration::ZERO,
            transition: false,
            kind,
        }
    }

    #[must_use]
    pub fn device_set(
        device_id: DeviceId,
        property: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self::new(
            Self::DEVICE_SET,
            SubActionKind::DeviceSet {
                device_id,
                property: property.into(),
                value: value.into(),
            },
        )
    }

    #[must_use]
    pub fn device_toggle(device_id: DeviceId, property: impl Into<String>) -> Self {
        Self::new(
            Self::DEVICE_TOGGLE,
            SubActionKind::DeviceToggle {
                device_id,
                property: property.into(),
            },
        )
    }

    #[must_use]
    pub fn notification(category: i32, message: impl Into<String>) -> Self {
        Self::new(
            Self::NOTIFICATION,
            SubActionKind::Notification {
                category,
                message: message.into(),
            },
        )
    }

    #[must_use]
    pub fn recursive_action(action_id: ActionId) -> Self {
        Self::new(
            Self::RECURSIVE_ACTION,
            SubActionKind::RecursiveAction { action_id },
        )
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_transition(mut self, transition: bool) -> Self {
        self.transition = transition;
        self
    }

    /// Discriminant used by every encoding of this sub-action.
    #[must_use]
    pub fn type_code(&self) -> u64 {
        self.type_code
    }

    /// Timeout in whole milliseconds, saturating.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// A step of an action: a thin handle over its [`SubActionImpl`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubAction {
    inner: SubActionImpl,
}

impl SubAction {
    #[must_use]
    pub fn new(inner: SubActionImpl) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &SubActionImpl {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> SubActionImpl {
        self.inner
    }
}

impl From<SubActionImpl> for SubAction {
    fn from(inner: SubActionImpl) -> Self {
        Self::new(inner)
    }
}

impl fmt::Display for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.kind.fmt(f)
    }
}

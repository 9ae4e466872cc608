//! Action execution — runs the effects of an [`Action`].
//!
//! Sub-actions without a timeout run inline and their first failure aborts
//! the rest of the action. Sub-actions with a timeout are handed to the
//! [`DelayScheduler`] together with a clone of the executor, so they only
//! capture shared handles and an owned copy of themselves.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};

use hearth_domain::action::{Action, SubActionImpl, SubActionKind};
use hearth_domain::device::PropertyAccess;
use hearth_domain::error::{ExecutionError, HearthError};
use hearth_domain::id::{DeviceId, UserId};

use crate::ports::{ActionStore, DelayHandle, DelayScheduler, DeviceRegistry, NotificationChannel};

/// Bounds applied while executing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Deepest [`SubActionKind::RecursiveAction`] nesting still executed.
    pub max_recursion: usize,
    /// Longest accepted sub-action timeout; longer ones are clamped.
    pub max_delay: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_recursion: 10,
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Payload broadcast by a notification sub-action.
#[must_use]
pub fn notification_payload(category: i32, message: &str) -> Value {
    json!({"notification": {"category": category, "message": message}})
}

/// Executes actions against the injected collaborators.
///
/// Cheap to clone; every clone shares the same collaborators and pending
/// delayed work.
#[derive(Clone)]
pub struct ActionExecutor {
    actions: Arc<dyn ActionStore>,
    notifier: Arc<dyn NotificationChannel>,
    devices: Arc<dyn DeviceRegistry>,
    delays: Arc<dyn DelayScheduler>,
    limits: ExecutionLimits,
    pending: Arc<Mutex<Vec<DelayHandle>>>,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(
        actions: Arc<dyn ActionStore>,
        notifier: Arc<dyn NotificationChannel>,
        devices: Arc<dyn DeviceRegistry>,
        delays: Arc<dyn DelayScheduler>,
    ) -> Self {
        Self {
            actions,
            notifier,
            devices,
            delays,
            limits: ExecutionLimits::default(),
            pending: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Device registry used for effects.
    #[must_use]
    pub fn devices(&self) -> &Arc<dyn DeviceRegistry> {
        &self.devices
    }

    /// Execute every sub-action of `action` in order.
    ///
    /// Past the recursion limit a non-empty action is skipped with a
    /// warning and reported as success.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an inline sub-action; the remaining
    /// sub-actions are not executed. Errors of delayed sub-actions are only
    /// logged.
    #[tracing::instrument(skip(self, action), fields(action_id = %action.id))]
    pub fn execute(&self, action: &Action, user: UserId, depth: usize) -> Result<(), HearthError> {
        if depth > self.limits.max_recursion && !action.sub_actions.is_empty() {
            tracing::warn!(
                depth,
                max_recursion = self.limits.max_recursion,
                "maximum recursion reached"
            );
            return Ok(());
        }
        for sub_action in &action.sub_actions {
            self.execute_sub_action(sub_action.inner(), user, depth)?;
        }
        Ok(())
    }

    /// Run `sub_action` now, or schedule it when it has a timeout.
    ///
    /// # Errors
    ///
    /// Returns the error of an inline effect. Scheduling never fails.
    pub fn execute_sub_action(
        &self,
        sub_action: &SubActionImpl,
        user: UserId,
        depth: usize,
    ) -> Result<(), HearthError> {
        if sub_action.timeout.is_zero() {
            return self.run_effect(sub_action, user, depth);
        }

        let mut delay = sub_action.timeout;
        if delay > self.limits.max_delay {
            tracing::warn!(
                requested_ms = sub_action.timeout_ms(),
                max_ms = u64::try_from(self.limits.max_delay.as_millis()).unwrap_or(u64::MAX),
                "sub action timeout exceeds maximum, clamping"
            );
            delay = self.limits.max_delay;
        }

        let executor = self.clone();
        let owned = sub_action.clone();
        let handle = self.delays.schedule(
            delay,
            Box::new(move || {
                if let Err(err) = executor.run_effect(&owned, user, depth) {
                    tracing::error!(sub_action = %owned.kind, error = %err, "delayed sub action failed");
                }
            }),
        );
        self.track(handle);
        Ok(())
    }

    /// Cancel every delayed sub-action that has not started yet.
    ///
    /// Returns how many were cancelled.
    pub fn cancel_pending(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let cancelled = pending.drain(..).filter(DelayHandle::cancel).count();
        if cancelled > 0 {
            tracing::info!(cancelled, "cancelled pending delayed sub actions");
        }
        cancelled
    }

    /// Delayed sub-actions scheduled and not yet started.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(DelayHandle::is_pending);
        pending.len()
    }

    fn track(&self, handle: DelayHandle) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(DelayHandle::is_pending);
        pending.push(handle);
    }

    fn run_effect(
        &self,
        sub_action: &SubActionImpl,
        user: UserId,
        depth: usize,
    ) -> Result<(), HearthError> {
        match &sub_action.kind {
            SubActionKind::DeviceSet {
                device_id,
                property,
                value,
            } => {
                self.writable_value(*device_id, property, user)?;
                self.set_property(*device_id, property, value.clone(), user)
            }
            SubActionKind::DeviceToggle {
                device_id,
                property,
            } => {
                let current = self.writable_value(*device_id, property, user)?;
                let Some(next) = toggled(&current) else {
                    tracing::debug!(%device_id, property, "toggle ignored for non boolean, non integer property");
                    return Ok(());
                };
                self.set_property(*device_id, property, next, user)
            }
            SubActionKind::Notification { category, message } => {
                self.notifier
                    .broadcast(notification_payload(*category, message));
                Ok(())
            }
            SubActionKind::RecursiveAction { action_id } => {
                let action = self
                    .actions
                    .get_action(*action_id, user)?
                    .ok_or(ExecutionError::ActionNotFound(*action_id))?;
                self.execute(&action, user, depth + 1)
            }
        }
    }

    /// Current value of a property that actions may write.
    fn writable_value(
        &self,
        device_id: DeviceId,
        property: &str,
        user: UserId,
    ) -> Result<Value, HearthError> {
        let device = self
            .devices
            .get_device(device_id, user)?
            .ok_or(ExecutionError::DeviceNotFound(device_id))?;
        device
            .property(property)
            .filter(|p| p.access.contains(PropertyAccess::ACTION_WRITE))
            .map(|p| p.value.clone())
            .ok_or_else(|| {
                ExecutionError::PropertyNotWritable {
                    device: device_id,
                    property: property.to_string(),
                }
                .into()
            })
    }

    fn set_property(
        &self,
        device_id: DeviceId,
        property: &str,
        value: Value,
        user: UserId,
    ) -> Result<(), HearthError> {
        self.devices
            .set_property(device_id, property, value, user)
            .map_err(|source| {
                ExecutionError::PropertySetFailed {
                    device: device_id,
                    property: property.to_string(),
                    source: Box::new(source),
                }
                .into()
            })
    }
}

/// Flipped boolean, or 0/1 toggle of an integer.
fn toggled(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(on) => Some(Value::Bool(!on)),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Some(json!(i64::from(n.as_i64() == Some(0))))
        }
        _ => None,
    }
}

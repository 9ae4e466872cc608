//! Device registry port — live devices and their properties.

use std::sync::Arc;

use hearth_domain::device::Device;
use hearth_domain::error::HearthError;
use hearth_domain::id::{DeviceId, UserId};
use hearth_domain::rule::DeviceState;

/// Access to the devices known to the controller.
pub trait DeviceRegistry: Send + Sync {
    /// Snapshot of the device with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read. A missing device is
    /// `Ok(None)`.
    fn get_device(&self, id: DeviceId, user: UserId) -> Result<Option<Device>, HearthError>;

    /// Write `value` to a property and notify observers.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or property does not exist, or if the
    /// device rejects the value.
    fn set_property(
        &self,
        id: DeviceId,
        property: &str,
        value: serde_json::Value,
        user: UserId,
    ) -> Result<(), HearthError>;
}

impl<T: DeviceRegistry + ?Sized> DeviceRegistry for Arc<T> {
    fn get_device(&self, id: DeviceId, user: UserId) -> Result<Option<Device>, HearthError> {
        (**self).get_device(id, user)
    }

    fn set_property(
        &self,
        id: DeviceId,
        property: &str,
        value: serde_json::Value,
        user: UserId,
    ) -> Result<(), HearthError> {
        (**self).set_property(id, property, value, user)
    }
}

/// Exposes a [`DeviceRegistry`] to condition evaluation.
pub struct RegistryDeviceState<'a> {
    registry: &'a dyn DeviceRegistry,
    user: UserId,
}

impl<'a> RegistryDeviceState<'a> {
    #[must_use]
    pub fn new(registry: &'a dyn DeviceRegistry, user: UserId) -> Self {
        Self { registry, user }
    }
}

impl DeviceState for RegistryDeviceState<'_> {
    fn property_value(&self, device: DeviceId, property: &str) -> Option<serde_json::Value> {
        match self.registry.get_device(device, self.user) {
            Ok(device) => device?.property_value(property).cloned(),
            Err(err) => {
                tracing::warn!(%device, property, error = %err, "failed to read device during rule evaluation");
                None
            }
        }
    }
}

//! Virtual device implementations — light, sensor, switch.
//!
//! Each virtual device has a fixed [`DeviceId`] so rules can refer to it
//! across restarts.

mod light;
mod sensor;
mod switch;

pub use light::VirtualLight;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use serde_json::Value;

use hearth_domain::device::Device;
use hearth_domain::error::HearthError;
use hearth_domain::id::DeviceId;

use crate::error::VirtualDeviceError;

/// Wrapper enum for the concrete virtual device types.
#[derive(Debug, Clone, Copy)]
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn id(&self) -> DeviceId {
        match self {
            Self::Light(d) => d.id,
            Self::Sensor(d) => d.id,
            Self::Switch(d) => d.id,
        }
    }

    /// Initial [`Device`] snapshot.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<Device, HearthError> {
        match self {
            Self::Light(d) => d.describe(),
            Self::Sensor(d) => d.describe(),
            Self::Switch(d) => d.describe(),
        }
    }

    /// Validate `value` for `property`, returning the value to store.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError::InvalidValue`] when the device cannot
    /// hold the value.
    pub fn accept(&self, property: &str, value: Value) -> Result<Value, VirtualDeviceError> {
        match self {
            Self::Light(d) => d.accept(property, value),
            Self::Sensor(d) => d.accept(property, value),
            Self::Switch(d) => d.accept(property, value),
        }
    }
}

pub(crate) fn expect_bool(
    device: DeviceId,
    property: &str,
    value: Value,
) -> Result<Value, VirtualDeviceError> {
    if value.is_boolean() {
        Ok(value)
    } else {
        Err(VirtualDeviceError::InvalidValue {
            device,
            property: property.to_string(),
            expected: "a boolean",
        })
    }
}

pub(crate) fn expect_integer(
    device: DeviceId,
    property: &str,
    value: &Value,
) -> Result<i64, VirtualDeviceError> {
    value.as_i64().ok_or_else(|| VirtualDeviceError::InvalidValue {
        device,
        property: property.to_string(),
        expected: "an integer",
    })
}

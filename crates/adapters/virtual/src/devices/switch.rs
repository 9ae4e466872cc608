//! Virtual switch — a single `on` property.

use serde_json::Value;

use hearth_domain::device::{Device, Property, PropertyAccess};
use hearth_domain::error::HearthError;
use hearth_domain::id::DeviceId;

use super::expect_bool;
use crate::error::VirtualDeviceError;

/// A simulated on/off switch.
#[derive(Debug, Clone, Copy)]
pub struct VirtualSwitch {
    pub id: DeviceId,
}

impl VirtualSwitch {
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<Device, HearthError> {
        Device::builder()
            .id(self.id)
            .name("Virtual Switch")
            .group("switches")
            .property("on", Property::new(false, PropertyAccess::FULL))
            .build()
    }

    /// # Errors
    ///
    /// Returns [`VirtualDeviceError`] unless `property` is `on` and `value`
    /// a boolean.
    pub fn accept(&self, property: &str, value: Value) -> Result<Value, VirtualDeviceError> {
        if property == "on" {
            expect_bool(self.id, property, value)
        } else {
            Err(VirtualDeviceError::UnknownProperty {
                device: self.id,
                property: property.to_string(),
            })
        }
    }
}

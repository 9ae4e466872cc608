//! Virtual temperature sensor — a read-only integer reading.

use serde_json::{Value, json};

use hearth_domain::device::{Device, Property, PropertyAccess};
use hearth_domain::error::HearthError;
use hearth_domain::id::DeviceId;

use super::expect_integer;
use crate::error::VirtualDeviceError;

const INITIAL_TEMPERATURE: i64 = 21;

/// A simulated temperature sensor.
///
/// Actions cannot write the reading (no `ACTION_WRITE`); it only changes
/// through [`VirtualDeviceRegistry::simulate`](crate::VirtualDeviceRegistry::simulate).
#[derive(Debug, Clone, Copy)]
pub struct VirtualSensor {
    pub id: DeviceId,
}

impl VirtualSensor {
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<Device, HearthError> {
        Device::builder()
            .id(self.id)
            .name("Virtual Sensor")
            .group("sensors")
            .property(
                "temperature",
                Property::new(INITIAL_TEMPERATURE, PropertyAccess::READ_ONLY),
            )
            .build()
    }

    /// # Errors
    ///
    /// Returns [`VirtualDeviceError`] unless `property` is `temperature` and
    /// `value` an integer.
    pub fn accept(&self, property: &str, value: Value) -> Result<Value, VirtualDeviceError> {
        if property == "temperature" {
            expect_integer(self.id, property, &value).map(|t| json!(t))
        } else {
            Err(VirtualDeviceError::UnknownProperty {
                device: self.id,
                property: property.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_expose_read_only_temperature() {
        let sensor = VirtualSensor {
            id: DeviceId::new(3),
        };
        let device = sensor.describe().unwrap();
        let temperature = device.property("temperature").unwrap();
        assert!(!temperature.access.contains(PropertyAccess::ACTION_WRITE));
        assert!(temperature.access.contains(PropertyAccess::RULE_READ));
    }
}

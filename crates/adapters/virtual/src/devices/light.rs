//! Virtual light — `on` switch plus a 0-100 `brightness`.

use serde_json::{Value, json};

use hearth_domain::device::{Device, Property, PropertyAccess};
use hearth_domain::error::HearthError;
use hearth_domain::id::DeviceId;

use super::{expect_bool, expect_integer};
use crate::error::VirtualDeviceError;

const MAX_BRIGHTNESS: i64 = 100;

/// A simulated dimmable light.
#[derive(Debug, Clone, Copy)]
pub struct VirtualLight {
    pub id: DeviceId,
}

impl VirtualLight {
    /// Produce the initial [`Device`] snapshot: off, full brightness.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails (should not happen
    /// with hardcoded inputs).
    pub fn describe(&self) -> Result<Device, HearthError> {
        Device::builder()
            .id(self.id)
            .name("Virtual Light")
            .group("lights")
            .property("on", Property::new(false, PropertyAccess::FULL))
            .property(
                "brightness",
                Property::new(MAX_BRIGHTNESS, PropertyAccess::FULL),
            )
            .build()
    }

    /// Brightness is clamped to 0-100.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError`] for unknown properties or wrongly typed
    /// values.
    pub fn accept(&self, property: &str, value: Value) -> Result<Value, VirtualDeviceError> {
        match property {
            "on" => expect_bool(self.id, property, value),
            "brightness" => {
                let level = expect_integer(self.id, property, &value)?;
                Ok(json!(level.clamp(0, MAX_BRIGHTNESS)))
            }
            _ => Err(VirtualDeviceError::UnknownProperty {
                device: self.id,
                property: property.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> VirtualLight {
        VirtualLight {
            id: DeviceId::new(1),
        }
    }

    #[test]
    fn should_default_to_off() {
        let device = light().describe().unwrap();
        assert_eq!(device.property_value("on"), Some(&json!(false)));
        assert_eq!(device.property_value("brightness"), Some(&json!(100)));
    }

    #[test]
    fn should_clamp_brightness() {
        assert_eq!(light().accept("brightness", json!(250)).unwrap(), json!(100));
        assert_eq!(light().accept("brightness", json!(-3)).unwrap(), json!(0));
    }

    #[test]
    fn should_reject_non_boolean_on_value() {
        assert!(matches!(
            light().accept("on", json!("yes")),
            Err(VirtualDeviceError::InvalidValue { .. })
        ));
    }
}

//! Virtual device error types.

use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::DeviceId;

/// Errors raised by the simulated devices.
#[derive(Debug, thiserror::Error)]
pub enum VirtualDeviceError {
    #[error("virtual device {0} does not exist")]
    UnknownDevice(DeviceId),

    #[error("virtual device {device} has no property `{property}`")]
    UnknownProperty { device: DeviceId, property: String },

    #[error("property `{property}` of virtual device {device} expects {expected}")]
    InvalidValue {
        device: DeviceId,
        property: String,
        expected: &'static str,
    },
}

impl From<VirtualDeviceError> for HearthError {
    fn from(err: VirtualDeviceError) -> Self {
        match err {
            VirtualDeviceError::UnknownDevice(id) => NotFoundError {
                entity: "device",
                id: id.to_string(),
            }
            .into(),
            other => Self::Storage(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_unknown_device_to_not_found() {
        let err: HearthError = VirtualDeviceError::UnknownDevice(DeviceId::new(8)).into();
        assert!(matches!(err, HearthError::NotFound(_)));
    }

    #[test]
    fn should_describe_invalid_value() {
        let err = VirtualDeviceError::InvalidValue {
            device: DeviceId::new(1),
            property: "on".to_string(),
            expected: "a boolean",
        };
        assert_eq!(
            err.to_string(),
            "property `on` of virtual device 1 expects a boolean"
        );
    }
}

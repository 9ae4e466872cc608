//! # hearth-adapter-virtual
//!
//! Virtual/demo integration that provides simulated devices for testing and
//! demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Id | Properties |
//! |--------|----|------------|
//! | Virtual Light | 1 | `on` (bool), `brightness` (0-100) |
//! | Virtual Switch | 2 | `on` (bool) |
//! | Virtual Sensor | 3 | `temperature` (read-only integer) |
//!
//! Property writes that change a value are published on the event bus as
//! `DevicePropertyChange` events.
//!
//! ## Dependency rule
//!
//! Depends on `hearth-app` (port traits, event bus) and `hearth-domain` only.

mod devices;
mod error;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;

use hearth_app::event_bus::EventBus;
use hearth_app::ports::DeviceRegistry;
use hearth_domain::device::Device;
use hearth_domain::error::HearthError;
use hearth_domain::event::{ChangeEvent, Event};
use hearth_domain::id::{DeviceId, UserId};

pub use devices::{VirtualDevice, VirtualLight, VirtualSensor, VirtualSwitch};
pub use error::VirtualDeviceError;

pub const LIGHT_ID: DeviceId = DeviceId::new(1);
pub const SWITCH_ID: DeviceId = DeviceId::new(2);
pub const SENSOR_ID: DeviceId = DeviceId::new(3);

struct Slot {
    kind: VirtualDevice,
    state: Device,
}

/// [`DeviceRegistry`] over the simulated devices.
pub struct VirtualDeviceRegistry {
    devices: Mutex<BTreeMap<DeviceId, Slot>>,
    bus: Option<Weak<EventBus>>,
}

impl VirtualDeviceRegistry {
    /// Registry with the light, switch and sensor.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a device descriptor cannot be built.
    pub fn new() -> Result<Self, HearthError> {
        Self::with_devices([
            VirtualDevice::Light(VirtualLight { id: LIGHT_ID }),
            VirtualDevice::Switch(VirtualSwitch { id: SWITCH_ID }),
            VirtualDevice::Sensor(VirtualSensor { id: SENSOR_ID }),
        ])
    }

    /// # Errors
    ///
    /// Returns a validation error if a device descriptor cannot be built.
    pub fn with_devices(
        devices: impl IntoIterator<Item = VirtualDevice>,
    ) -> Result<Self, HearthError> {
        let devices = devices
            .into_iter()
            .map(|kind| -> Result<_, HearthError> {
                let state = kind.describe()?;
                Ok((kind.id(), Slot { kind, state }))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            devices: Mutex::new(devices),
            bus: None,
        })
    }

    /// Publish property changes on `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: &Arc<EventBus>) -> Self {
        self.bus = Some(Arc::downgrade(bus));
        self
    }

    /// Snapshot of every device, ordered by id.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.lock().values().map(|slot| slot.state.clone()).collect()
    }

    /// Change a reading as the physical device would, ignoring access flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or property does not exist or the value
    /// has the wrong type.
    pub fn simulate(&self, id: DeviceId, property: &str, value: Value) -> Result<(), HearthError> {
        self.write(id, property, value, None)
    }

    fn write(
        &self,
        id: DeviceId,
        property: &str,
        value: Value,
        user: Option<UserId>,
    ) -> Result<(), HearthError> {
        let change = {
            let mut devices = self.lock();
            let slot = devices
                .get_mut(&id)
                .ok_or(VirtualDeviceError::UnknownDevice(id))?;
            let value = slot.kind.accept(property, value)?;
            let old = slot.state.clone();
            let Some(current) = slot.state.properties.get_mut(property) else {
                return Err(VirtualDeviceError::UnknownProperty {
                    device: id,
                    property: property.to_string(),
                }
                .into());
            };
            if current.value == value {
                tracing::trace!(device_id = %id, property, "property unchanged");
                return Ok(());
            }
            current.value = value;
            tracing::debug!(device_id = %id, property, value = %current.value, "property changed");
            ChangeEvent::new(Some(old), slot.state.clone(), property.to_string(), user)
        };

        if let Some(bus) = self.bus.as_ref().and_then(Weak::upgrade) {
            bus.dispatch(&Event::DevicePropertyChange(change));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<DeviceId, Slot>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceRegistry for VirtualDeviceRegistry {
    fn get_device(&self, id: DeviceId, _user: UserId) -> Result<Option<Device>, HearthError> {
        Ok(self.lock().get(&id).map(|slot| slot.state.clone()))
    }

    fn set_property(
        &self,
        id: DeviceId,
        property: &str,
        value: Value,
        user: UserId,
    ) -> Result<(), HearthError> {
        self.write(id, property, value, Some(user))
    }
}

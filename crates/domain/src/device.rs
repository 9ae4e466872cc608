//! Device — a physical or virtual thing exposing named properties.
//!
//! Every property carries access flags. Automation effects may only write a
//! property whose flags include [`PropertyAccess::ACTION_WRITE`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::id::DeviceId;

bitflags::bitflags! {
    /// Who may read or write a device property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PropertyAccess: u8 {
        const USER_READ = 1;
        const USER_WRITE = 1 << 1;
        const RULE_READ = 1 << 2;
        const ACTION_WRITE = 1 << 3;
    }
}

impl PropertyAccess {
    /// Readable and writable by users, rules and actions.
    pub const FULL: Self = Self::all();
    /// Observable only (sensors).
    pub const READ_ONLY: Self = Self::USER_READ.union(Self::RULE_READ);
}

/// One named value of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub value: serde_json::Value,
    pub access: PropertyAccess,
}

impl Property {
    #[must_use]
    pub fn new(value: impl Into<serde_json::Value>, access: PropertyAccess) -> Self {
        Self {
            value: value.into(),
            access,
        }
    }
}

/// Snapshot of a device and its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Look up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Current value of a property, if present.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name).map(|p| &p.value)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when `name` is empty.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    groups: Vec<String>,
    properties: BTreeMap<String, Property>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the name is missing or empty.
    pub fn build(self) -> Result<Device, HearthError> {
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            groups: self.groups,
            properties: self.properties,
        };
        device.validate()?;
        Ok(device)
    }
}

//! Registry mapping sub-action type codes to factories.
//!
//! Decoding resolves the type code from the input, builds a fresh instance
//! through the registered factory, then lets the instance populate itself from
//! that same input.

use std::collections::BTreeMap;

use crate::error::{DecodeError, HearthError, UnknownTypeError};
use crate::id::{ActionId, DeviceId};

use super::codec::{SubActionMessage, SubActionRow};
use super::sub_action::{SubAction, SubActionImpl, SubActionKind};

/// Builds an empty implementation for the type code it is registered under.
pub type SubActionFactory = fn(u64) -> SubActionImpl;

/// A registered factory and its display name.
#[derive(Debug, Clone, Copy)]
pub struct SubActionInfo {
    pub factory: SubActionFactory,
    pub name: &'static str,
}

/// Factory registry keyed by type code.
#[derive(Debug, Default, Clone)]
pub struct SubActionRegistry {
    factories: BTreeMap<u64, SubActionInfo>,
}

impl SubActionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in sub-actions at codes 0, 1, 2 and 5.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// Register `info` under `type_code`.
    ///
    /// Returns `false`, keeping the existing factory, when the code is taken.
    pub fn register(&mut self, info: SubActionInfo, type_code: u64) -> bool {
        if let Some(existing) = self.factories.get(&type_code) {
            tracing::warn!(
                type_code,
                name = info.name,
                existing = existing.name,
                "sub action type code already registered"
            );
            return false;
        }
        self.factories.insert(type_code, info);
        true
    }

    /// Register the built-in sub-actions.
    ///
    /// Does nothing but log a warning when factories are already registered.
    pub fn register_defaults(&mut self) {
        if !self.factories.is_empty() {
            tracing::warn!("default sub actions requested after sub actions were registered");
            return;
        }
        self.register(
            SubActionInfo {
                factory: |code| {
                    SubActionImpl::new(
                        code,
                        SubActionKind::DeviceSet {
                            device_id: DeviceId::default(),
                            property: String::new(),
                            value: serde_json::Value::Null,
                        },
                    )
                },
                name: "device_set",
            },
            SubActionImpl::DEVICE_SET,
        );
        self.register(
            SubActionInfo {
                factory: |code| {
                    SubActionImpl::new(
                        code,
                        SubActionKind::DeviceToggle {
                            device_id: DeviceId::default(),
                            property: String::new(),
                        },
                    )
                },
                name: "device_toggle",
            },
            SubActionImpl::DEVICE_TOGGLE,
        );
        self.register(
            SubActionInfo {
                factory: |code| {
                    SubActionImpl::new(
                        code,
                        SubActionKind::Notification {
                            category: 0,
                            message: String::new(),
                        },
                    )
                },
                name: "notification",
            },
            SubActionImpl::NOTIFICATION,
        );
        self.register(
            SubActionInfo {
                factory: |code| {
                    SubActionImpl::new(
                        code,
                        SubActionKind::RecursiveAction {
                            action_id: ActionId::default(),
                        },
                    )
                },
                name: "recursive_action",
            },
            SubActionImpl::RECURSIVE_ACTION,
        );
    }

    /// Build a fresh, empty implementation for `type_code`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTypeError`] (after logging a warning) when nothing is
    /// registered under `type_code`.
    pub fn get_impl(&self, type_code: u64) -> Result<SubActionImpl, UnknownTypeError> {
        match self.factories.get(&type_code) {
            Some(info) => Ok((info.factory)(type_code)),
            None => {
                tracing::warn!(type_code, "unknown sub action implementation type");
                Err(UnknownTypeError { type_code })
            }
        }
    }

    /// Decode a sub-action from its JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Decode`] when `type` is missing or a field is
    /// malformed, [`HearthError::UnknownType`] for unregistered codes.
    pub fn parse_json(&self, json: &serde_json::Value) -> Result<SubAction, HearthError> {
        let type_code = json
            .get("type")
            .ok_or(DecodeError::MissingField("type"))?
            .as_u64()
            .ok_or_else(|| DecodeError::InvalidField {
                field: "type",
                reason: "expected an unsigned integer".to_string(),
            })?;
        let mut instance = self.get_impl(type_code)?;
        instance.parse_json(json)?;
        Ok(SubAction::new(instance))
    }

    /// Decode a sub-action from a wire message.
    ///
    /// # Errors
    ///
    /// See [`SubActionRegistry::parse_json`].
    pub fn parse_message(&self, message: &SubActionMessage) -> Result<SubAction, HearthError> {
        let mut instance = self.get_impl(message.action_type)?;
        instance.parse_message(message)?;
        Ok(SubAction::new(instance))
    }

    /// Decode a sub-action from a stored row.
    ///
    /// # Errors
    ///
    /// See [`SubActionRegistry::parse_json`].
    pub fn parse_row(&self, row: &SubActionRow) -> Result<SubAction, HearthError> {
        let mut instance = self.get_impl(row.action_type)?;
        instance.parse_row(row)?;
        Ok(SubAction::new(instance))
    }

    /// Registered type codes with their factories, in code order.
    pub fn registered(&self) -> impl Iterator<Item = (u64, &SubActionInfo)> {
        self.factories.iter().map(|(code, info)| (*code, info))
    }
}

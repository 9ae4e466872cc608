//! Action — a named, ordered sequence of sub-actions.
//!
//! Actions are the effects of rules and can be invoked from other actions
//! through [`SubActionKind::RecursiveAction`]. Execution lives in the
//! application layer; this module holds the data model, its encodings, and
//! the [`SubActionRegistry`] that resolves polymorphic sub-actions.

mod codec;
mod registry;
mod sub_action;

pub use codec::{SubActionMessage, SubActionRow};
pub use registry::{SubActionFactory, SubActionInfo, SubActionRegistry};
pub use sub_action::{SubAction, SubActionImpl, SubActionKind};

use serde::Deserialize;
use serde_json::json;

use crate::error::{HearthError, ValidationError};
use crate::id::ActionId;

/// A named list of sub-actions executed in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub icon: String,
    pub color: u32,
    pub visible: bool,
    pub sub_actions: Vec<SubAction>,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            id: ActionId::default(),
            name: String::new(),
            icon: String::new(),
            color: 0,
            visible: true,
            sub_actions: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionJson {
    #[serde(default)]
    id: ActionId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: u32,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    sub_actions: Vec<serde_json::Value>,
}

fn default_visible() -> bool {
    true
}

impl Action {
    /// Create a builder for constructing an [`Action`].
    #[must_use]
    pub fn builder() -> ActionBuilder {
        ActionBuilder::default()
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

    /// JSON object `{id, name, icon, color, visible, subActions}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "icon": self.icon,
            "color": self.color,
            "visible": self.visible,
            "subActions": self
                .sub_actions
                .iter()
                .map(|sub| sub.inner().to_json())
                .collect::<Vec<_>>(),
        })
    }

    /// Decode an action, resolving sub-actions through `registry`.
    ///
    /// `id` defaults to 0 (not persisted) and `visible` to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Decode`] or [`HearthError::UnknownType`] when the
    /// document or one of its sub-actions cannot be decoded.
    pub fn from_json(
        json: &serde_json::Value,
        registry: &SubActionRegistry,
    ) -> Result<Self, HearthError> {
        let raw = ActionJson::deserialize(json).map_err(crate::error::DecodeError::from)?;
        let sub_actions = raw
            .sub_actions
            .iter()
            .map(|sub| registry.parse_json(sub))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            icon: raw.icon,
            color: raw.color,
            visible: raw.visible,
            sub_actions,
        })
    }
}

/// Step-by-step builder for [`Action`].
#[derive(Debug, Default)]
pub struct ActionBuilder {
    id: Option<ActionId>,
    name: Option<String>,
    icon: Option<String>,
    color: Option<u32>,
    visible: Option<bool>,
    sub_actions: Vec<SubAction>,
}

impl ActionBuilder {
    #[must_use]
    pub fn id(mut self, id: ActionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    #[must_use]
    pub fn sub_action(mut self, sub_action: impl Into<SubAction>) -> Self {
        self.sub_actions.push(sub_action.into());
        self
    }

    /// Consume the builder and return an [`Action`].
    ///
    /// Actions carry no construction invariants; stores call
    /// [`Action::validate`] before persisting.
    #[must_use]
    pub fn build(self) -> Action {
        Action {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            icon: self.icon.unwrap_or_default(),
            color: self.color.unwrap_or_default(),
            visible: self.visible.unwrap_or(true),
            sub_actions: self.sub_actions,
        }
    }
}

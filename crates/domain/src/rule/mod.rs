//! Rule — a condition tree paired with an effect [`Action`].
//!
//! Rules fire when their condition becomes satisfied, either in reaction to a
//! dispatched event or, for time-based conditions, when the clock reaches the
//! next execution time.

mod condition;
mod time;

pub use condition::{
    Condition, DeviceCondition, DeviceState, EvaluationContext, LogicOperator, NumericCompare,
};
pub use time::{TimeCondition, TimeKind};

use serde::Deserialize;
use serde_json::json;

use crate::action::{Action, SubActionRegistry};
use crate::error::{DecodeError, HearthError, ValidationError};
use crate::id::RuleId;
use crate::time::Timestamp;

/// An automation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub icon: String,
    pub color: u32,
    pub condition: Option<Condition>,
    pub effect: Action,
    pub enabled: bool,
}

#[derive(Deserialize)]
struct RuleJson {
    #[serde(default)]
    id: RuleId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: u32,
    #[serde(default)]
    condition: Option<Condition>,
    #[serde(default)]
    effect: Option<serde_json::Value>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `condition` is missing ([`ValidationError::MissingCondition`])
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.condition.is_none() {
            return Err(ValidationError::MissingCondition.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn is_time_based(&self) -> bool {
        self.condition.as_ref().is_some_and(Condition::is_time_based)
    }

    #[must_use]
    pub fn next_execution_time(&self, now: Timestamp) -> Option<Timestamp> {
        self.condition.as_ref()?.next_execution_time(now)
    }

    /// Enabled and its condition holds.
    #[must_use]
    pub fn is_satisfied(&self, ctx: &EvaluationContext<'_>) -> bool {
        self.enabled
            && self
                .condition
                .as_ref()
                .is_some_and(|condition| condition.is_satisfied(ctx))
    }

    /// JSON object `{id, name, icon, color, condition, effect, enabled}`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Decode`] if the condition cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, HearthError> {
        let condition = serde_json::to_value(&self.condition).map_err(DecodeError::from)?;
        Ok(json!({
            "id": self.id,
            "name": self.name,
            "icon": self.icon,
            "color": self.color,
            "condition": condition,
            "effect": self.effect.to_json(),
            "enabled": self.enabled,
        }))
    }

    /// Decode a rule, resolving effect sub-actions through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Decode`] or [`HearthError::UnknownType`] when
    /// the document cannot be decoded.
    pub fn from_json(
        json: &serde_json::Value,
        registry: &SubActionRegistry,
    ) -> Result<Self, HearthError> {
        let raw = RuleJson::deserialize(json).map_err(DecodeError::from)?;
        let effect = match &raw.effect {
            Some(effect) => Action::from_json(effect, registry)?,
            None => Action::default(),
        };
        Ok(Self {
            id: raw.id,
            name: raw.name,
            icon: raw.icon,
            color: raw.color,
            condition: raw.condition,
            effect,
            enabled: raw.enabled,
        })
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    icon: Option<String>,
    color: Option<u32>,
    condition: Option<Condition>,
    effect: Option<Action>,
    enabled: Option<bool>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
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
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn effect(mut self, effect: Action) -> Self {
        self.effect = Some(effect);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the name or condition is missing.
    pub fn build(self) -> Result<Rule, HearthError> {
        let rule = Rule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            icon: self.icon.unwrap_or_default(),
            color: self.color.unwrap_or_default(),
            condition: self.condition,
            effect: self.effect.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
        };
        rule.validate()?;
        Ok(rule)
    }
}

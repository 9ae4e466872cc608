//! Event — an immutable record of something that happened.
//!
//! Events are produced by the operation that caused the change and handed to
//! the event bus, which delivers them to handlers and then drops them. Each
//! kind carries a stable [`EventType`] tag derived from its name.

use std::fmt;

use crate::action::Action;
use crate::device::Device;
use crate::id::UserId;
use crate::rule::Rule;

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// 64-bit FNV-1 hash of an event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(u64);

impl EventType {
    pub const ERROR: Self = Self::from_name("error");
    pub const ACTION_CHANGE: Self = Self::from_name("action_change");
    pub const RULE_CHANGE: Self = Self::from_name("rule_change");
    pub const DEVICE_CHANGE: Self = Self::from_name("device_change");
    pub const DEVICE_PROPERTY_CHANGE: Self = Self::from_name("device_property_change");

    const KNOWN: [(Self, &'static str); 5] = [
        (Self::ERROR, "error"),
        (Self::ACTION_CHANGE, "action_change"),
        (Self::RULE_CHANGE, "rule_change"),
        (Self::DEVICE_CHANGE, "device_change"),
        (Self::DEVICE_PROPERTY_CHANGE, "device_property_change"),
    ];

    /// Hash `name` into an event type.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash = hash.wrapping_mul(FNV_PRIME) ^ bytes[i] as u64;
            i += 1;
        }
        Self(hash)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Name of a built-in event type.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::KNOWN
            .iter()
            .find(|(known, _)| *known == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#018x}", self.0),
        }
    }
}

/// Something failed somewhere and observers should know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
    pub place: String,
}

/// `changed` replaced `old`; `changed_fields` tells what differs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<T, F> {
    /// `None` for additions.
    pub old: Option<T>,
    pub changed: T,
    pub changed_fields: F,
    /// Acting user, when known.
    pub user: Option<UserId>,
}

impl<T, F> ChangeEvent<T, F> {
    #[must_use]
    pub fn new(old: Option<T>, changed: T, changed_fields: F, user: Option<UserId>) -> Self {
        Self {
            old,
            changed,
            changed_fields,
            user,
        }
    }
}

/// Fields of an [`Action`] named by an action change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionFields {
    Name,
    Icon,
    Color,
    SubActions,
    Visible,
    All,
    Add,
    Remove,
}

impl ActionFields {
    /// The single field that differs, or `All`.
    #[must_use]
    pub fn between(old: &Action, new: &Action) -> Self {
        let changed = [
            (old.name != new.name, Self::Name),
            (old.icon != new.icon, Self::Icon),
            (old.color != new.color, Self::Color),
            (old.sub_actions != new.sub_actions, Self::SubActions),
            (old.visible != new.visible, Self::Visible),
        ];
        single_change(&changed).unwrap_or(Self::All)
    }
}

/// Fields of a [`Rule`] named by a rule change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFields {
    Name,
    Icon,
    Color,
    Condition,
    Effect,
    Enabled,
    All,
    Add,
    Remove,
}

impl RuleFields {
    /// The single field that differs, or `All`.
    #[must_use]
    pub fn between(old: &Rule, new: &Rule) -> Self {
        let changed = [
            (old.name != new.name, Self::Name),
            (old.icon != new.icon, Self::Icon),
            (old.color != new.color, Self::Color),
            (old.condition != new.condition, Self::Condition),
            (old.effect != new.effect, Self::Effect),
            (old.enabled != new.enabled, Self::Enabled),
        ];
        single_change(&changed).unwrap_or(Self::All)
    }
}

/// Fields of a [`Device`] named by a device change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFields {
    Name,
    Groups,
    All,
    Add,
    Remove,
}

fn single_change<F: Copy>(changed: &[(bool, F)]) -> Option<F> {
    let mut fields = changed.iter().filter(|(differs, _)| *differs);
    match (fields.next(), fields.next()) {
        (Some((_, field)), None) => Some(*field),
        _ => None,
    }
}

pub type ActionChangeEvent = ChangeEvent<Action, ActionFields>;
pub type RuleChangeEvent = ChangeEvent<Rule, RuleFields>;
pub type DeviceChangeEvent = ChangeEvent<Device, DeviceFields>;
/// `changed_fields` holds the name of the property that changed.
pub type DevicePropertyChangeEvent = ChangeEvent<Device, String>;

/// Every event the bus carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Error(ErrorEvent),
    ActionChange(ActionChangeEvent),
    RuleChange(RuleChangeEvent),
    DeviceChange(DeviceChangeEvent),
    DevicePropertyChange(DevicePropertyChangeEvent),
}

impl Event {
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Error(_) => EventType::ERROR,
            Self::ActionChange(_) => EventType::ACTION_CHANGE,
            Self::RuleChange(_) => EventType::RULE_CHANGE,
            Self::DeviceChange(_) => EventType::DEVICE_CHANGE,
            Self::DevicePropertyChange(_) => EventType::DEVICE_PROPERTY_CHANGE,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, place: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            message: message.into(),
            place: place.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Condition;

    #[test]
    fn should_hash_with_fnv1() {
        assert_eq!(EventType::from_name("").value(), FNV_OFFSET_BASIS);
        // FNV-1 of "a": multiply first, then xor.
        assert_eq!(
            EventType::from_name("a").value(),
            FNV_OFFSET_BASIS.wrapping_mul(FNV_PRIME) ^ 0x61
        );
    }

    #[test]
    fn should_assign_distinct_types_to_builtin_events() {
        let mut types: Vec<_> = EventType::KNOWN.iter().map(|(t, _)| *t).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), 5);
    }

    #[test]
    fn should_display_builtin_name() {
        assert_eq!(EventType::RULE_CHANGE.to_string(), "rule_change");
        assert!(EventType::from_name("custom").to_string().starts_with("0x"));
    }

    #[test]
    fn should_tag_events_with_their_type() {
        let event = Event::error("boom", "tests");
        assert_eq!(event.event_type(), EventType::ERROR);
    }

    #[test]
    fn should_name_single_changed_rule_field() {
        let old = Rule::builder()
            .name("Rule")
            .condition(Condition::Constant { state: false })
            .build()
            .unwrap();
        let mut new = old.clone();
        new.condition = Some(Condition::Constant { state: true });
        assert_eq!(RuleFields::between(&old, &new), RuleFields::Condition);

        new.name = "Renamed".to_string();
        assert_eq!(RuleFields::between(&old, &new), RuleFields::All);
    }

    #[test]
    fn should_report_all_when_nothing_changed() {
        let action = Action::builder().name("a").build();
        assert_eq!(ActionFields::between(&action, &action), ActionFields::All);
    }
}

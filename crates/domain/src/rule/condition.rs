//! Condition — the predicate tree deciding when a rule fires.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};
use crate::id::DeviceId;
use crate::time::Timestamp;

use super::time::TimeCondition;

/// Read access to live device property values during evaluation.
pub trait DeviceState {
    fn property_value(&self, device: DeviceId, property: &str) -> Option<serde_json::Value>;
}

/// Inputs a condition may depend on.
pub struct EvaluationContext<'a> {
    pub now: Timestamp,
    pub devices: &'a dyn DeviceState,
}

/// Numeric comparison used by time and device conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericCompare {
    /// `|x - v1| <= v2`.
    Equals,
    /// Outside `v1 ± v2`.
    NotEquals,
    Greater,
    Less,
    /// `v1 <= x <= v2`, wrapping around when `v1 > v2`.
    InRange,
}

impl NumericCompare {
    #[must_use]
    pub fn holds(self, x: i64, v1: i64, v2: i64) -> bool {
        let near = x >= v1.saturating_sub(v2) && x <= v1.saturating_add(v2);
        match self {
            Self::Equals => near,
            Self::NotEquals => !near,
            Self::Greater => x > v1,
            Self::Less => x < v1,
            Self::InRange if v1 <= v2 => (v1..=v2).contains(&x),
            Self::InRange => x >= v1 || x <= v2,
        }
    }
}

/// Boolean combinator of a compare condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    And,
    Or,
    Nand,
    Nor,
    /// XNOR.
    Equal,
    /// XOR.
    NotEqual,
}

impl LogicOperator {
    /// Combine child results; a missing child is `None`.
    ///
    /// Without children the result is `false`. With one child only `Or`
    /// (identity) and `Nor` (negation) produce a value; every other operator
    /// yields `false`.
    #[must_use]
    pub fn combine(self, left: Option<bool>, right: Option<bool>) -> bool {
        match (left, right) {
            (Some(l), Some(r)) => match self {
                Self::And => l && r,
                Self::Or => l || r,
                Self::Nand => !(l && r),
                Self::Nor => !(l || r),
                Self::Equal => l == r,
                Self::NotEqual => l != r,
            },
            (Some(only), None) | (None, Some(only)) => match self {
                Self::Or => only,
                Self::Nor => !only,
                _ => false,
            },
            (None, None) => false,
        }
    }
}

/// Compares a device property with `value1` / `value2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceCondition {
    pub device_id: DeviceId,
    pub property: String,
    pub value1: i64,
    #[serde(default)]
    pub value2: i64,
    pub compare: NumericCompare,
}

impl DeviceCondition {
    fn matches(&self, value: &serde_json::Value) -> bool {
        match as_integer(value) {
            Some(x) => self.compare.holds(x, self.value1, self.value2),
            None => {
                tracing::warn!(
                    device_id = %self.device_id,
                    property = %self.property,
                    %value,
                    "device condition cannot compare a non numeric property"
                );
                false
            }
        }
    }
}

fn as_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Bool(b) => Some(i64::from(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        _ => None,
    }
}

/// Predicate tree. Type codes follow declaration order (0-3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Constant {
        state: bool,
    },
    Compare {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        left: Option<Box<Condition>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<Box<Condition>>,
        operator: LogicOperator,
    },
    Time(TimeCondition),
    Device(DeviceCondition),
}

impl Condition {
    #[must_use]
    pub fn compare(left: Condition, operator: LogicOperator, right: Condition) -> Self {
        Self::Compare {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            operator,
        }
    }

    #[must_use]
    pub fn type_code(&self) -> u64 {
        match self {
            Self::Constant { .. } => 0,
            Self::Compare { .. } => 1,
            Self::Time(_) => 2,
            Self::Device(_) => 3,
        }
    }

    /// Direct children (compare conditions only).
    pub fn children(&self) -> impl Iterator<Item = &Condition> {
        let (left, right) = match self {
            Self::Compare { left, right, .. } => (left.as_deref(), right.as_deref()),
            _ => (None, None),
        };
        left.into_iter().chain(right)
    }

    /// `true` if this node or any descendant is a time condition.
    #[must_use]
    pub fn is_time_based(&self) -> bool {
        matches!(self, Self::Time(_)) || self.children().any(Condition::is_time_based)
    }

    /// Earliest next execution time over all time leaves.
    #[must_use]
    pub fn next_execution_time(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Self::Time(time) => time.next_execution_time(now),
            _ => self
                .children()
                .filter_map(|child| child.next_execution_time(now))
                .min(),
        }
    }

    /// Whether `is_satisfied_after_event` is meaningful for events of `event_type`.
    #[must_use]
    pub fn should_execute_on(&self, event_type: EventType) -> bool {
        match self {
            Self::Constant { .. } | Self::Time(_) => true,
            Self::Device(_) => event_type == EventType::DEVICE_PROPERTY_CHANGE,
            Self::Compare { .. } => self
                .children()
                .any(|child| child.should_execute_on(event_type)),
        }
    }

    /// Evaluate against the current state.
    #[must_use]
    pub fn is_satisfied(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            Self::Constant { state } => *state,
            Self::Compare {
                left,
                right,
                operator,
            } => operator.combine(
                left.as_deref().map(|c| c.is_satisfied(ctx)),
                right.as_deref().map(|c| c.is_satisfied(ctx)),
            ),
            Self::Time(time) => time.is_satisfied_at(ctx.now),
            Self::Device(device) => {
                match ctx.devices.property_value(device.device_id, &device.property) {
                    Some(value) => device.matches(&value),
                    None => {
                        tracing::warn!(
                            device_id = %device.device_id,
                            property = %device.property,
                            "device condition refers to a missing device or property"
                        );
                        false
                    }
                }
            }
        }
    }

    /// Evaluate in reaction to `event`.
    ///
    /// Device leaves only look at property changes of their own device and
    /// property. Compare nodes use the after-event result of children that
    /// react to this event type and the plain result of the others.
    #[must_use]
    pub fn is_satisfied_after_event(&self, event: &Event, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            Self::Constant { .. } | Self::Time(_) => self.is_satisfied(ctx),
            Self::Device(device) => match event {
                Event::DevicePropertyChange(change)
                    if change.changed.id == device.device_id
                        && change.changed_fields == device.property =>
                {
                    change
                        .changed
                        .property_value(&device.property)
                        .is_some_and(|value| device.matches(value))
                }
                _ => false,
            },
            Self::Compare {
                left,
                right,
                operator,
            } => {
                let eval = |child: &Condition| {
                    if child.should_execute_on(event.event_type()) {
                        child.is_satisfied_after_event(event, ctx)
                    } else {
                        child.is_satisfied(ctx)
                    }
                };
                operator.combine(left.as_deref().map(eval), right.as_deref().map(eval))
            }
        }
    }
}

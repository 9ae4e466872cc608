//! Typed identifier newtypes backed by `u64`.
//!
//! The value `0` is reserved for "not yet persisted"; stores assign real
//! identifiers on insertion.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Access the raw identifier.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }

            /// `true` while the identifier has not been assigned by a store.
            #[must_use]
            pub const fn is_unassigned(self) -> bool {
                self.0 == 0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an [`Action`](crate::action::Action).
    ActionId
);

define_id!(
    /// Unique identifier for a [`Rule`](crate::rule::Rule).
    RuleId
);

define_id!(
    /// Unique identifier for a [`Device`](crate::device::Device).
    DeviceId
);

define_id!(
    /// Identifier of the user on whose behalf an operation runs.
    UserId
);

impl UserId {
    /// Identity used for work the system performs on its own (scheduled rules).
    pub const SYSTEM: Self = Self(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_unassigned_when_value_is_zero() {
        assert!(ActionId::default().is_unassigned());
        assert!(!ActionId::new(3).is_unassigned());
    }

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = DeviceId::new(42);
        let parsed: DeviceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_serialize_as_plain_number() {
        let json = serde_json::to_string(&RuleId::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: RuleId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, RuleId::new(7));
    }

    #[test]
    fn should_return_error_when_parsing_non_numeric_id() {
        let result = ActionId::from_str("not-a-number");
        assert!(result.is_err());
    }

    #[test]
    fn should_order_ids_by_value() {
        assert!(RuleId::new(1) < RuleId::new(2));
    }
}

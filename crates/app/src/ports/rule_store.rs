//! Rule store port — listing of stored rules.

use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::id::UserId;
use hearth_domain::rule::Rule;

/// Restricts which rules a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFilter {
    /// Only rules with this `enabled` state, when set.
    pub enabled: Option<bool>,
}

impl RuleFilter {
    /// Enabled rules only.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
        }
    }

    #[must_use]
    pub fn matches(&self, rule: &Rule) -> bool {
        self.enabled.is_none_or(|enabled| rule.enabled == enabled)
    }
}

/// Read access to stored rules.
pub trait RuleStore: Send + Sync {
    /// Snapshot of every rule matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get_all_rules(&self, filter: &RuleFilter, user: UserId) -> Result<Vec<Rule>, HearthError>;
}

impl<T: RuleStore + ?Sized> RuleStore for Arc<T> {
    fn get_all_rules(&self, filter: &RuleFilter, user: UserId) -> Result<Vec<Rule>, HearthError> {
        (**self).get_all_rules(filter, user)
    }
}

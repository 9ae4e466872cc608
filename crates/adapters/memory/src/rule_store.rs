//! In-memory [`RuleStore`].

use hearth_app::ports::{RuleFilter, RuleStore};
use hearth_domain::dispatch::DispatchResult;
use hearth_domain::error::HearthError;
use hearth_domain::event::{RuleChangeEvent, RuleFields};
use hearth_domain::id::{RuleId, UserId};
use hearth_domain::rule::Rule;

use crate::error::MemoryStoreError;
use crate::table::{Record, Table};

impl Record for Rule {
    const ENTITY: &'static str = "rule";

    type Fields = RuleFields;
    const ADDED: RuleFields = RuleFields::Add;
    const REMOVED: RuleFields = RuleFields::Remove;

    fn key(&self) -> u64 {
        self.id.value()
    }

    fn assign_key(&mut self, key: u64) {
        self.id = RuleId::new(key);
    }

    fn validate(&self) -> Result<(), HearthError> {
        Rule::validate(self)
    }

    fn changed_fields(old: &Self, new: &Self) -> RuleFields {
        RuleFields::between(old, new)
    }
}

/// Rules kept in process memory, announcing every change.
#[derive(Default)]
pub struct InMemoryRuleStore {
    table: Table<Rule>,
}

impl InMemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for [`RuleChangeEvent`]s.
    ///
    /// Handlers run after the store lock is released and may read the
    /// store, but must not modify it.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: FnMut(&RuleChangeEvent, &()) -> DispatchResult + Send + 'static,
    {
        self.table.subscribe(handler);
    }

    /// Store a new rule. An unassigned id gets the next free one.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is invalid or its id is taken.
    pub fn add(&self, rule: Rule, user: Option<UserId>) -> Result<RuleId, MemoryStoreError> {
        self.table.insert(rule, user).map(RuleId::new)
    }

    /// # Errors
    ///
    /// Returns an error if the rule is invalid or unknown.
    pub fn update(&self, rule: Rule, user: Option<UserId>) -> Result<(), MemoryStoreError> {
        self.table.replace(rule, user)
    }

    /// # Errors
    ///
    /// Returns [`MemoryStoreError::NotFound`] if no rule has this id.
    pub fn remove(&self, id: RuleId, user: Option<UserId>) -> Result<Rule, MemoryStoreError> {
        self.table.delete(id.value(), user)
    }

    #[must_use]
    pub fn get_rule(&self, id: RuleId) -> Option<Rule> {
        self.table.get(id.value())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RuleStore for InMemoryRuleStore {
    fn get_all_rules(&self, filter: &RuleFilter, _user: UserId) -> Result<Vec<Rule>, HearthError> {
        Ok(self
            .table
            .all()
            .into_iter()
            .filter(|rule| filter.matches(rule))
            .collect())
    }
}

//! Time-ordered queue of rules waiting for their next execution time.

use std::collections::{BTreeMap, HashMap};

use hearth_domain::id::RuleId;
use hearth_domain::rule::Rule;
use hearth_domain::time::Timestamp;

/// Rules keyed by `(next execution time, id)`; the head is the earliest.
///
/// Each rule id appears at most once.
#[derive(Debug, Default)]
pub(super) struct TimedQueue {
    by_time: BTreeMap<(Timestamp, RuleId), Rule>,
    index: HashMap<RuleId, Timestamp>,
}

impl TimedQueue {
    /// Insert or replace `rule`. Returns `true` if the head time changed.
    pub fn upsert(&mut self, next: Timestamp, rule: Rule) -> bool {
        let before = self.peek_time();
        if let Some(previous) = self.index.insert(rule.id, next) {
            self.by_time.remove(&(previous, rule.id));
        }
        self.by_time.insert((next, rule.id), rule);
        before != self.peek_time()
    }

    /// Drop the rule with `id`. Returns `true` if the head time changed.
    pub fn remove(&mut self, id: RuleId) -> bool {
        let before = self.peek_time();
        if let Some(next) = self.index.remove(&id) {
            self.by_time.remove(&(next, id));
        }
        before != self.peek_time()
    }

    pub fn peek_time(&self) -> Option<Timestamp> {
        self.by_time.keys().next().map(|(next, _)| *next)
    }

    /// Pop the head if it is due at `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<Rule> {
        if self.peek_time()? > now {
            return None;
        }
        let ((_, id), rule) = self.by_time.pop_first()?;
        self.index.remove(&id);
        Some(rule)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn clear(&mut self) {
        self.by_time.clear();
        self.index.clear();
    }

    /// Queued rule ids, earliest first.
    pub fn ids(&self) -> Vec<RuleId> {
        self.by_time.keys().map(|(_, id)| *id).collect()
    }
}

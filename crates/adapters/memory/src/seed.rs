//! JSON seed documents for the in-memory stores.
//!
//! ```json
//! { "actions": [ { "name": "...", "subActions": [...] } ],
//!   "rules":   [ { "name": "...", "condition": {...}, "effect": {...} } ] }
//! ```

use serde::Deserialize;

use hearth_domain::action::{Action, SubActionRegistry};
use hearth_domain::rule::Rule;

use crate::action_store::InMemoryActionStore;
use crate::error::MemoryStoreError;
use crate::rule_store::InMemoryRuleStore;

#[derive(Debug, Default, Deserialize)]
struct SeedDocument {
    #[serde(default)]
    actions: Vec<serde_json::Value>,
    #[serde(default)]
    rules: Vec<serde_json::Value>,
}

/// Number of records a seed added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub actions: usize,
    pub rules: usize,
}

/// Parse `document` and add its actions and rules to the stores.
///
/// Sub-actions are resolved through `registry`. Records are added in
/// document order; the first invalid record stops the load.
///
/// # Errors
///
/// Returns [`MemoryStoreError::Seed`] if the document is not valid JSON, or
/// the error of the first record that cannot be decoded or stored.
pub fn load_seed(
    document: &str,
    registry: &SubActionRegistry,
    actions: &InMemoryActionStore,
    rules: &InMemoryRuleStore,
) -> Result<SeedSummary, MemoryStoreError> {
    let seed: SeedDocument = serde_json::from_str(document).map_err(MemoryStoreError::Seed)?;
    let mut summary = SeedSummary::default();

    for json in &seed.actions {
        let action = Action::from_json(json, registry)?;
        actions.add(action, None)?;
        summary.actions += 1;
    }
    for json in &seed.rules {
        let rule = Rule::from_json(json, registry)?;
        rules.add(rule, None)?;
        summary.rules += 1;
    }

    tracing::info!(
        actions = summary.actions,
        rules = summary.rules,
        "seeded in-memory stores"
    );
    Ok(summary)
}

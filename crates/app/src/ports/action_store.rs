//! Action store port — lookup of stored actions.

use std::sync::Arc;

use hearth_domain::action::Action;
use hearth_domain::error::HearthError;
use hearth_domain::id::{ActionId, UserId};

/// Read access to stored actions.
pub trait ActionStore: Send + Sync {
    /// Fetch a snapshot of the action with `id` as seen by `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails. A missing action is
    /// `Ok(None)`.
    fn get_action(&self, id: ActionId, user: UserId) -> Result<Option<Action>, HearthError>;
}

impl<T: ActionStore + ?Sized> ActionStore for Arc<T> {
    fn get_action(&self, id: ActionId, user: UserId) -> Result<Option<Action>, HearthError> {
        (**self).get_action(id, user)
    }
}

//! In-memory [`ActionStore`].

use hearth_app::ports::ActionStore;
use hearth_domain::action::Action;
use hearth_domain::dispatch::DispatchResult;
use hearth_domain::error::HearthError;
use hearth_domain::event::{ActionChangeEvent, ActionFields};
use hearth_domain::id::{ActionId, UserId};

use crate::error::MemoryStoreError;
use crate::table::{Record, Table};

impl Record for Action {
    const ENTITY: &'static str = "action";

    type Fields = ActionFields;
    const ADDED: ActionFields = ActionFields::Add;
    const REMOVED: ActionFields = ActionFields::Remove;

    fn key(&self) -> u64 {
        self.id.value()
    }

    fn assign_key(&mut self, key: u64) {
        self.id = ActionId::new(key);
    }

    fn validate(&self) -> Result<(), HearthError> {
        Action::validate(self)
    }

    fn changed_fields(old: &Self, new: &Self) -> ActionFields {
        ActionFields::between(old, new)
    }
}

/// Actions kept in process memory, announcing every change.
#[derive(Default)]
pub struct InMemoryActionStore {
    table: Table<Action>,
}

impl InMemoryActionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for [`ActionChangeEvent`]s.
    ///
    /// Handlers run after the store lock is released but must not modify
    /// this store.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: FnMut(&ActionChangeEvent, &()) -> DispatchResult + Send + 'static,
    {
        self.table.subscribe(handler);
    }

    /// Store a new action. An unassigned id gets the next free one.
    ///
    /// # Errors
    ///
    /// Returns an error if the action is invalid or its id is taken.
    pub fn add(&self, action: Action, user: Option<UserId>) -> Result<ActionId, MemoryStoreError> {
        self.table.insert(action, user).map(ActionId::new)
    }

    /// # Errors
    ///
    /// Returns an error if the action is invalid or unknown.
    pub fn update(&self, action: Action, user: Option<UserId>) -> Result<(), MemoryStoreError> {
        self.table.replace(action, user)
    }

    /// # Errors
    ///
    /// Returns [`MemoryStoreError::NotFound`] if no action has this id.
    pub fn remove(&self, id: ActionId, user: Option<UserId>) -> Result<Action, MemoryStoreError> {
        self.table.delete(id.value(), user)
    }

    /// Every action, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Action> {
        self.table.all()
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

impl ActionStore for InMemoryActionStore {
    fn get_action(&self, id: ActionId, _user: UserId) -> Result<Option<Action>, HearthError> {
        Ok(self.table.get(id.value()))
    }
}

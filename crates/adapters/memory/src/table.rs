//! Generic keyed table shared by the in-memory stores.
//!
//! Records live behind one mutex and the change channel behind another, so
//! handlers run after the record lock is released and may read the store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hearth_app::emitter::TypedEmitter;
use hearth_domain::dispatch::DispatchResult;
use hearth_domain::error::HearthError;
use hearth_domain::event::ChangeEvent;
use hearth_domain::id::UserId;

use crate::error::MemoryStoreError;

/// A value stored in a [`Table`].
pub trait Record: Clone + Send + 'static {
    const ENTITY: &'static str;

    /// Changed-field indicator carried by change events.
    type Fields: Copy + Send + 'static;
    const ADDED: Self::Fields;
    const REMOVED: Self::Fields;

    fn key(&self) -> u64;
    fn assign_key(&mut self, key: u64);

    /// # Errors
    ///
    /// Returns an error if the record breaks a domain invariant.
    fn validate(&self) -> Result<(), HearthError>;

    fn changed_fields(old: &Self, new: &Self) -> Self::Fields;
}

pub type Change<R> = ChangeEvent<R, <R as Record>::Fields>;

struct Rows<R> {
    rows: BTreeMap<u64, R>,
    next_key: u64,
}

pub struct Table<R: Record> {
    rows: Mutex<Rows<R>>,
    changes: Mutex<TypedEmitter<Change<R>>>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Rows {
                rows: BTreeMap::new(),
                next_key: 1,
            }),
            changes: Mutex::new(TypedEmitter::new()),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn subscribe<F>(&self, handler: F)
    where
        F: FnMut(&Change<R>, &()) -> DispatchResult + Send + 'static,
    {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_handler(handler);
    }

    pub fn get(&self, key: u64) -> Option<R> {
        self.lock_rows().rows.get(&key).cloned()
    }

    pub fn all(&self) -> Vec<R> {
        self.lock_rows().rows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_rows().rows.len()
    }

    /// Store `record`, assigning the next free key when it has none.
    pub fn insert(&self, mut record: R, user: Option<UserId>) -> Result<u64, MemoryStoreError> {
        record.validate()?;
        let key = {
            let mut rows = self.lock_rows();
            let key = match record.key() {
                0 => rows.next_key,
                key if rows.rows.contains_key(&key) => {
                    return Err(MemoryStoreError::Duplicate {
                        entity: R::ENTITY,
                        id: key,
                    });
                }
                key => key,
            };
            rows.next_key = rows.next_key.max(key.saturating_add(1));
            record.assign_key(key);
            rows.rows.insert(key, record.clone());
            key
        };
        tracing::debug!(entity = R::ENTITY, id = key, "record added");
        self.emit(&ChangeEvent::new(None, record, R::ADDED, user));
        Ok(key)
    }

    /// Replace the record sharing `record`'s key.
    pub fn replace(&self, record: R, user: Option<UserId>) -> Result<(), MemoryStoreError> {
        record.validate()?;
        let key = record.key();
        let old = self
            .lock_rows()
            .rows
            .get_mut(&key)
            .map(|slot| std::mem::replace(slot, record.clone()))
            .ok_or(MemoryStoreError::NotFound {
                entity: R::ENTITY,
                id: key,
            })?;
        let fields = R::changed_fields(&old, &record);
        tracing::debug!(entity = R::ENTITY, id = key, "record updated");
        self.emit(&ChangeEvent::new(Some(old), record, fields, user));
        Ok(())
    }

    pub fn delete(&self, key: u64, user: Option<UserId>) -> Result<R, MemoryStoreError> {
        let removed = self
            .lock_rows()
            .rows
            .remove(&key)
            .ok_or(MemoryStoreError::NotFound {
                entity: R::ENTITY,
                id: key,
            })?;
        tracing::debug!(entity = R::ENTITY, id = key, "record removed");
        self.emit(&ChangeEvent::new(None, removed.clone(), R::REMOVED, user));
        Ok(removed)
    }

    fn emit(&self, change: &Change<R>) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(change, &());
    }

    fn lock_rows(&self) -> MutexGuard<'_, Rows<R>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

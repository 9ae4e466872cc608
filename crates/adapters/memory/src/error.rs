//! In-memory store error type.

use hearth_domain::error::{HearthError, NotFoundError};

/// Errors originating from the in-memory stores.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// No record with this id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Adding a record whose id is already taken.
    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: u64 },

    /// The seed file could not be read or parsed.
    #[error("invalid seed document")]
    Seed(#[source] serde_json::Error),

    /// A domain-level error (validation, decoding, etc.).
    #[error("domain error")]
    Domain(#[source] HearthError),
}

impl From<HearthError> for MemoryStoreError {
    fn from(err: HearthError) -> Self {
        Self::Domain(err)
    }
}

impl From<MemoryStoreError> for HearthError {
    fn from(err: MemoryStoreError) -> Self {
        match err {
            MemoryStoreError::NotFound { entity, id } => NotFoundError {
                entity,
                id: id.to_string(),
            }
            .into(),
            MemoryStoreError::Domain(err) => err,
            other => Self::Storage(Box::new(other)),
        }
    }
}

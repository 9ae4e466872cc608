//! Common error types used across the workspace.
//!
//! [`HearthError`] is the base error. Each concern has its own typed error
//! that converts into it via `#[from]`; adapters do the same with their own
//! error types.

use crate::id::{ActionId, DeviceId};

/// Base error for every fallible operation in hearth.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to encode payload")]
    Encode(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("rule has no condition")]
    MissingCondition,
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A JSON document, wire message or stored row could not be decoded.
///
/// Decoding never yields a partially populated value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("payload carries type {found}, expected {expected}")]
    TypeMismatch { expected: u64, found: u64 },

    #[error("malformed json")]
    Json(#[from] serde_json::Error),

    #[error("malformed binary payload")]
    Binary(#[from] bincode::error::DecodeError),
}

/// No factory is registered for a sub-action type code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sub action implementation type: {type_code}")]
pub struct UnknownTypeError {
    pub type_code: u64,
}

/// Failure raised while an effect runs.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("tried to change a property of a nonexistent device {0}")]
    DeviceNotFound(DeviceId),

    #[error("property `{property}` of device {device} does not allow action writes")]
    PropertyNotWritable { device: DeviceId, property: String },

    #[error("setting property `{property}` of device {device} failed")]
    PropertySetFailed {
        device: DeviceId,
        property: String,
        #[source]
        source: Box<HearthError>,
    },

    #[error("action {0} does not exist")]
    ActionNotFound(ActionId),
}

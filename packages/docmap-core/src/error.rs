//! Model error types.

use thiserror::Error;

/// Errors raised by schema definition, accessor dispatch, and persistence.
///
/// Dirty-tracking queries never produce these; a lookup on an unknown
/// attribute answers with an absent value instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Hydrated data is tagged with a different kind than requested
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// No stored document under the identifier
    #[error("Document '{id}' not found")]
    DocumentNotFound { id: String },

    /// Operation needs a persisted identifier
    #[error("Record of kind '{kind}' has no id")]
    MissingId { kind: String },

    /// Attribute or accessor declared twice in one schema
    #[error("Field '{field}' already declared for kind '{kind}'")]
    DuplicateField { kind: String, field: String },

    /// Accessor method name not generated for this kind
    #[error("Unknown accessor '{method}' for kind '{kind}'")]
    UnknownAccessor { kind: String, method: String },

    /// Malformed call arguments or definitions
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the storage client
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

//! Domain-specific error types

use thiserror::Error;

/// Domain-level errors for dependency risk analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid dependency key '{key}': {reason}")]
    InvalidDependencyKey { key: String, reason: String },

    #[error("Invalid input for field {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Recommendation {id} was already applied")]
    AlreadyApplied { id: String },
}

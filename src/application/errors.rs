//! Application layer error types

use crate::domain::DomainError;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Signal collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Advisory model error: {0}")]
    Advisory(#[from] AdvisoryError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },
}

/// Errors raised while collecting repository signals or vulnerabilities
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("GitHub error: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limit exceeded for {api}")]
    RateLimit { api: String },

    #[error("Timeout occurred after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Errors raised while consulting the advisory model
#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Advisory model API key is not configured")]
    MissingApiKey,

    #[error("Advisory model returned no text")]
    EmptyResponse,

    #[error("Timeout occurred after {seconds}s")]
    Timeout { seconds: u64 },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Authentication failed")]
    Authentication,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Circuit breaker is open")]
    CircuitOpen,
}

impl ApiError {
    /// Map a non-success HTTP status onto an API error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => ApiError::Authentication,
            503 => ApiError::ServiceUnavailable,
            _ => ApiError::Http {
                status,
                message: message.into(),
            },
        }
    }
}

impl ApplicationError {
    /// Get the error type as a string for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            ApplicationError::Domain(_) => "domain_error",
            ApplicationError::Collection(_) => "collection_error",
            ApplicationError::Advisory(_) => "advisory_error",
            ApplicationError::Configuration { .. } => "configuration_error",
            ApplicationError::Json(_) => "json_error",
            ApplicationError::NotFound { .. } => "not_found",
        }
    }
}

//! HTTP middleware for the web server

use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::time::Instant;
use uuid::Uuid;

use crate::application::errors::ApplicationError;
use crate::domain::DomainError;
use crate::presentation::models::ErrorResponse;

/// Error handling middleware
impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApplicationError::Domain(DomainError::InvalidDependencyKey { .. }) => (
                StatusCode::BAD_REQUEST,
                "INVALID_DEPENDENCY_KEY",
                "Dependency key must look like packageManager:name:version",
            ),
            ApplicationError::Domain(DomainError::InvalidInput { .. }) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                "Request contains invalid input",
            ),
            ApplicationError::Domain(DomainError::AlreadyApplied { .. }) => (
                StatusCode::CONFLICT,
                "ALREADY_APPLIED",
                "Recommendation was already applied",
            ),
            ApplicationError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
            }
            ApplicationError::Collection(_) | ApplicationError::Advisory(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "An upstream service failed",
            ),
            ApplicationError::Configuration { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "Service configuration error",
            ),
            ApplicationError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), "Request failed: {}", self);
        }

        let error_response = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            details: Some(serde_json::json!({ "error": self.to_string() })),
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Request logging middleware with timing and request ID
pub async fn logging_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Processing request"
    );

    let response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = start_time.elapsed().as_millis(),
        "Request completed"
    );

    response
}

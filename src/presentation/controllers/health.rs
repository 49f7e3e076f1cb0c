//! Health check controller

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde_json::json;

use crate::infrastructure::CircuitState;
use crate::presentation::controllers::AppState;
use crate::presentation::models::{CollectorStatsDto, HealthResponse};

/// Basic health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: None,
    })
}

/// Detailed health including degradation counters and circuit states.
///
/// Reports `degraded` while any upstream circuit is open. Requests are still
/// answered in that state, with empty signals or fallback opinions.
#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses(
        (status = 200, description = "Detailed health information", body = HealthResponse)
    )
)]
pub async fn detailed_health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let circuits = app_state.analysis_service.circuit_stats().await;
    let status = if circuits.iter().any(|c| c.state == CircuitState::Open) {
        "degraded"
    } else {
        "healthy"
    };

    let collector: CollectorStatsDto = app_state.collector_stats.snapshot().into();

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: Some(json!({
            "collector": collector,
            "circuits": circuits,
            "uptime_seconds": app_state.started_at.elapsed().as_secs(),
            "build_info": {
                "version": env!("CARGO_PKG_VERSION"),
                "build_date": option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown"),
                "build_timestamp": option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
            }
        })),
    })
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive")
    )
)]
pub async fn liveness_probe() -> StatusCode {
    StatusCode::OK
}

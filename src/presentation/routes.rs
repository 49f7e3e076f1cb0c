//! Route definitions and server setup

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::Config;
use crate::presentation::{
    controllers::{
        analysis::{
            AppState, analyze_dependency, assess_risk, batch_analyze, dependency_report,
            list_vulnerabilities, project_analysis, repository_signal,
        },
        health::{detailed_health_check, health_check, liveness_probe},
    },
    middleware::logging_middleware,
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::analysis::analyze_dependency,
        crate::presentation::controllers::analysis::assess_risk,
        crate::presentation::controllers::analysis::batch_analyze,
        crate::presentation::controllers::analysis::dependency_report,
        crate::presentation::controllers::analysis::project_analysis,
        crate::presentation::controllers::analysis::list_vulnerabilities,
        crate::presentation::controllers::analysis::repository_signal,
        crate::presentation::controllers::health::health_check,
        crate::presentation::controllers::health::detailed_health_check,
        crate::presentation::controllers::health::liveness_probe
    ),
    components(
        schemas(
            AnalyzeRequest,
            BatchAnalyzeRequest,
            ProjectAnalysisRequest,
            RecommendationDto,
            RiskAssessmentDto,
            SubScoresDto,
            VulnerabilityDto,
            VulnerabilitySummaryDto,
            VulnerabilityListResponse,
            RepositorySignalDto,
            DependencyReportDto,
            ProjectSummaryDto,
            CollectorStatsDto,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "dependencies", description = "Dependency risk assessment and upgrade recommendations"),
        (name = "health", description = "Service health and degradation counters")
    ),
    info(
        title = "Dependency Advisor API",
        version = "0.1.0",
        description = "Combines repository health signals, known vulnerabilities and an advisory model opinion into risk scores, risk levels and upgrade recommendations.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    )
)]
pub struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Create the application router with the middleware stack
pub fn create_router(app_state: AppState, config: &Config) -> Router {
    let dependency_routes = Router::new()
        .route("/analyze", post(analyze_dependency))
        .route("/risk-assessment", get(assess_risk))
        .route("/batch-analyze", post(batch_analyze))
        .route("/report", get(dependency_report))
        .route("/project-analysis", post(project_analysis))
        .route("/vulnerabilities", get(list_vulnerabilities))
        .route("/repository-signal", get(repository_signal));

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/health/live", get(liveness_probe));

    let mut router = Router::new()
        .nest("/api/v1/dependencies", dependency_routes)
        .merge(health_routes);

    if config.server.enable_docs {
        router = router
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server.allowed_origins))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_seconds,
                )))
                .layer(middleware::from_fn(logging_middleware)),
        )
        .with_state(app_state)
}

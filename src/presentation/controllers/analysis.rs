//! Analysis controller for dependency risk and recommendation endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::application::{CollectorStats, DependencyAnalysisService, errors::ApplicationError};
use crate::domain::{DependencyKey, DomainError, Ecosystem};
use crate::presentation::models::{
    AnalyzeRequest, BatchAnalyzeRequest, DependencyQuery, DependencyReportDto, ErrorResponse,
    ProjectAnalysisRequest, ProjectSummaryDto, RecommendationDto, RepositorySignalDto,
    RepositorySignalQuery, RiskAssessmentDto, VulnerabilityListResponse,
};

/// Application state containing services
#[derive(Clone)]
pub struct AppState {
    pub analysis_service: Arc<dyn DependencyAnalysisService>,
    pub collector_stats: Arc<CollectorStats>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        analysis_service: Arc<dyn DependencyAnalysisService>,
        collector_stats: Arc<CollectorStats>,
    ) -> Self {
        Self {
            analysis_service,
            collector_stats,
            started_at: Instant::now(),
        }
    }
}

/// Build a dependency key from separately supplied parts
fn dependency_key(
    package_manager: &str,
    dependency: &str,
    version: &str,
) -> Result<DependencyKey, ApplicationError> {
    let ecosystem = Ecosystem::from_str(package_manager).map_err(|message| {
        ApplicationError::Domain(DomainError::InvalidInput {
            field: "package_manager".to_string(),
            message,
        })
    })?;
    Ok(DependencyKey::new(ecosystem, dependency, version)?)
}

/// Analyze an upgrade and produce a recommendation
#[utoipa::path(
    post,
    path = "/api/v1/dependencies/analyze",
    tag = "dependencies",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Recommendation generated", body = RecommendationDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn analyze_dependency(
    State(app_state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<RecommendationDto>, ApplicationError> {
    tracing::info!(
        "Analyzing {} {} -> {}",
        request.dependency,
        request.current_version,
        request.target_version
    );

    let dependency = dependency_key(
        &request.package_manager,
        &request.dependency,
        &request.current_version,
    )?;
    let recommendation = app_state
        .analysis_service
        .analyze_and_recommend(&dependency, &request.target_version)
        .await?;

    Ok(Json(recommendation.into()))
}

/// Assess the risk of a dependency version
#[utoipa::path(
    get,
    path = "/api/v1/dependencies/risk-assessment",
    tag = "dependencies",
    params(DependencyQuery),
    responses(
        (status = 200, description = "Risk assessment", body = RiskAssessmentDto),
        (status = 400, description = "Invalid dependency", body = ErrorResponse)
    )
)]
pub async fn assess_risk(
    State(app_state): State<AppState>,
    Query(query): Query<DependencyQuery>,
) -> Result<Json<RiskAssessmentDto>, ApplicationError> {
    let dependency = dependency_key(&query.package_manager, &query.dependency, &query.version)?;
    let assessment = app_state.analysis_service.assess_risk(&dependency).await?;
    Ok(Json(assessment.into()))
}

/// Analyze several upgrades at once. Malformed or failing entries are skipped.
#[utoipa::path(
    post,
    path = "/api/v1/dependencies/batch-analyze",
    tag = "dependencies",
    request_body = BatchAnalyzeRequest,
    responses(
        (status = 200, description = "Recommendations for the entries that could be analyzed", body = [RecommendationDto])
    )
)]
pub async fn batch_analyze(
    State(app_state): State<AppState>,
    Json(BatchAnalyzeRequest(targets)): Json<BatchAnalyzeRequest>,
) -> Json<Vec<RecommendationDto>> {
    tracing::info!("Batch analysis requested for {} dependencies", targets.len());

    let recommendations = app_state.analysis_service.batch_analyze(targets).await;
    Json(recommendations.into_iter().map(Into::into).collect())
}

/// Full report for a dependency version
#[utoipa::path(
    get,
    path = "/api/v1/dependencies/report",
    tag = "dependencies",
    params(DependencyQuery),
    responses(
        (status = 200, description = "Dependency report", body = DependencyReportDto),
        (status = 400, description = "Invalid dependency", body = ErrorResponse)
    )
)]
pub async fn dependency_report(
    State(app_state): State<AppState>,
    Query(query): Query<DependencyQuery>,
) -> Result<Json<DependencyReportDto>, ApplicationError> {
    let dependency = dependency_key(&query.package_manager, &query.dependency, &query.version)?;
    let report = app_state.analysis_service.build_report(&dependency).await?;
    Ok(Json(report.into()))
}

/// Risk roll-up over a project's dependencies
#[utoipa::path(
    post,
    path = "/api/v1/dependencies/project-analysis",
    tag = "dependencies",
    request_body = ProjectAnalysisRequest,
    responses(
        (status = 200, description = "Project summary", body = ProjectSummaryDto)
    )
)]
pub async fn project_analysis(
    State(app_state): State<AppState>,
    Json(ProjectAnalysisRequest(keys)): Json<ProjectAnalysisRequest>,
) -> Json<ProjectSummaryDto> {
    tracing::info!("Project analysis requested for {} dependencies", keys.len());

    let summary = app_state.analysis_service.project_analysis(keys).await;
    Json(summary.into())
}

/// Known vulnerabilities of a dependency version
#[utoipa::path(
    get,
    path = "/api/v1/dependencies/vulnerabilities",
    tag = "dependencies",
    params(DependencyQuery),
    responses(
        (status = 200, description = "Vulnerabilities and security score", body = VulnerabilityListResponse),
        (status = 400, description = "Invalid dependency", body = ErrorResponse)
    )
)]
pub async fn list_vulnerabilities(
    State(app_state): State<AppState>,
    Query(query): Query<DependencyQuery>,
) -> Result<Json<VulnerabilityListResponse>, ApplicationError> {
    let dependency = dependency_key(&query.package_manager, &query.dependency, &query.version)?;
    let lookup = app_state.analysis_service.vulnerabilities(&dependency).await;
    Ok(Json(lookup.into()))
}

/// Repository health signal for a dependency name
#[utoipa::path(
    get,
    path = "/api/v1/dependencies/repository-signal",
    tag = "dependencies",
    params(RepositorySignalQuery),
    responses(
        (status = 200, description = "Repository signal", body = RepositorySignalDto),
        (status = 400, description = "Missing dependency name", body = ErrorResponse)
    )
)]
pub async fn repository_signal(
    State(app_state): State<AppState>,
    Query(query): Query<RepositorySignalQuery>,
) -> Result<Json<RepositorySignalDto>, ApplicationError> {
    let dependency = query.dependency.trim();
    if dependency.is_empty() {
        return Err(DomainError::InvalidInput {
            field: "dependency".to_string(),
            message: "Dependency name cannot be empty".to_string(),
        }
        .into());
    }

    let signal = app_state.analysis_service.repository_signal(dependency).await;
    Ok(Json(signal.into()))
}

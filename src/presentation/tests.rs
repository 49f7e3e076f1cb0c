// Router tests against a stub analysis service
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tower::ServiceExt;

use crate::application::{
    ApplicationError, CollectorStats, DependencyAnalysisService, VulnerabilityLookup,
};
use crate::domain::{
    AdvisoryOpinion, DependencyKey, DependencyReport, ProjectSummary, Recommendation,
    RecommendationContext, RecommendationSynthesizer, RepositorySignal, RiskAssessment,
    RiskClassifier, VulnerabilitySummary, fallback_insights,
};
use crate::infrastructure::CircuitBreakerStats;
use crate::presentation::{AppState, ErrorResponse, HealthResponse, create_router};

/// Answers every operation from empty signals and the fallback opinion
struct StubService;

#[async_trait]
impl DependencyAnalysisService for StubService {
    async fn analyze_and_recommend(
        &self,
        dependency: &DependencyKey,
        target_version: &str,
    ) -> Result<Recommendation, ApplicationError> {
        let signal = RepositorySignal::empty();
        let opinion = AdvisoryOpinion::fallback();
        let context = RecommendationContext {
            package_manager: dependency.ecosystem,
            dependency: &dependency.name,
            current_version: &dependency.version,
            target_version,
            security_score: 100.0,
            stability_score: 80.0,
            signal: &signal,
            vulnerabilities: &[],
            opinion: &opinion,
        };
        Ok(RecommendationSynthesizer::new().synthesize(&context, Utc::now()))
    }

    async fn assess_risk(&self, dependency: &DependencyKey) -> Result<RiskAssessment, ApplicationError> {
        Ok(RiskAssessment::new(
            dependency.clone(),
            &RepositorySignal::empty(),
            &[],
            &fallback_insights(),
            Utc::now(),
        ))
    }

    async fn batch_analyze(&self, _targets: HashMap<String, String>) -> Vec<Recommendation> {
        Vec::new()
    }

    async fn build_report(&self, dependency: &DependencyKey) -> Result<DependencyReport, ApplicationError> {
        let assessment = self.assess_risk(dependency).await?;
        Ok(DependencyReport {
            dependency: dependency.name.clone(),
            version: dependency.version.clone(),
            package_manager: dependency.ecosystem,
            repository_signal: RepositorySignal::empty(),
            vulnerabilities: Vec::new(),
            vulnerability_summary: VulnerabilitySummary::default(),
            security_score: assessment.scores.security,
            stability_score: assessment.scores.stability,
            overall_risk_level: RiskClassifier::new().classify(assessment.score),
            risk_assessment: assessment,
            ecosystem_insights: fallback_insights(),
            generated_at: Utc::now(),
        })
    }

    async fn project_analysis(&self, dependency_keys: Vec<String>) -> ProjectSummary {
        ProjectSummary::from_assessments(dependency_keys.len(), BTreeMap::new(), dependency_keys)
    }

    async fn vulnerabilities(&self, dependency: &DependencyKey) -> VulnerabilityLookup {
        VulnerabilityLookup {
            dependency: dependency.name.clone(),
            version: dependency.version.clone(),
            package_manager: dependency.ecosystem,
            vulnerabilities: Vec::new(),
            count: 0,
            security_score: 100.0,
        }
    }

    async fn repository_signal(&self, _dependency: &str) -> RepositorySignal {
        RepositorySignal::empty()
    }

    async fn circuit_stats(&self) -> Vec<CircuitBreakerStats> {
        Vec::new()
    }
}

fn stub_state() -> AppState {
    AppState::new(Arc::new(StubService), Arc::new(CollectorStats::new()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn docs_disabled_returns_404() {
    let mut config = crate::Config::default();
    config.server.enable_docs = false;
    let app = create_router(stub_state(), &config);

    let response = app.oneshot(get("/docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn docs_enabled_returns_ok() {
    let mut config = crate::Config::default();
    config.server.enable_docs = true;
    let app = create_router(stub_state(), &config);

    let response = app.oneshot(get("/docs")).await.unwrap();
    // Swagger UI may redirect (303) before serving index depending on version
    assert!(
        matches!(response.status(), StatusCode::OK | StatusCode::SEE_OTHER),
        "unexpected status: {}",
        response.status()
    );
}

#[tokio::test]
async fn detailed_health_reports_collector_counters() {
    let stats = Arc::new(CollectorStats::new());
    stats.record_advisory_fallback();
    let state = AppState::new(Arc::new(StubService), stats);
    let app = create_router(state, &crate::Config::default());

    let response = app.oneshot(get("/health/detailed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    let details = health.details.unwrap();
    assert_eq!(details["collector"]["advisory_fallbacks"], 1);
    assert_eq!(details["collector"]["repository_failures"], 0);
}

#[tokio::test]
async fn unknown_package_manager_is_bad_request() {
    let app = create_router(stub_state(), &crate::Config::default());

    let response = app
        .oneshot(get(
            "/api/v1/dependencies/risk-assessment?package_manager=cpan&dependency=Moose&version=2.2201",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code, "INVALID_INPUT");
}

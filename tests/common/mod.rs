//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dependency_advisor::Config;
use dependency_advisor::application::errors::{AdvisoryError, ApiError, CollectionError};
use dependency_advisor::application::{
    Advisor, CollectorStats, DependencyAnalysisServiceImpl, SignalCollector,
};
use dependency_advisor::domain::{DependencyKey, Severity, VulnerabilityRecord};
use dependency_advisor::infrastructure::{
    AdvisoryModel, CircuitBreakerConfig, DependentSearch, GenerationOptions,
    RepositorySignalSource, RepositoryStats, RetryConfig, VulnerabilitySource,
};
use dependency_advisor::presentation::{AppState, create_router};

/// Repository source with a fixed, healthy sample repository
pub struct StaticRepositories {
    pub available: bool,
}

#[async_trait]
impl RepositorySignalSource for StaticRepositories {
    async fn search_dependents(
        &self,
        dependency: &str,
        _limit: u32,
    ) -> Result<DependentSearch, CollectionError> {
        if !self.available {
            return Err(CollectionError::Api(ApiError::Authentication));
        }
        Ok(DependentSearch {
            total_count: 1200,
            repositories: vec![format!("{}/{}", dependency, dependency)],
        })
    }

    async fn fetch_repository(&self, repository: &str) -> Result<RepositoryStats, CollectionError> {
        Ok(RepositoryStats {
            full_name: repository.to_string(),
            stars: 58_000,
            forks: 7_000,
            open_issues: 40,
            language: Some("JavaScript".to_string()),
            pushed_at: None,
        })
    }

    async fn rollback_count(
        &self,
        _repository: &str,
        _version: Option<&str>,
    ) -> Result<u32, CollectionError> {
        Ok(1)
    }

    async fn has_hotfix(
        &self,
        _repository: &str,
        _version: Option<&str>,
    ) -> Result<bool, CollectionError> {
        Ok(false)
    }
}

/// Vulnerability source keyed by dependency name
pub struct StaticVulnerabilities {
    pub by_name: HashMap<String, Vec<VulnerabilityRecord>>,
    pub available: bool,
}

impl StaticVulnerabilities {
    pub fn sample() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(
            "lodash".to_string(),
            vec![
                VulnerabilityRecord::new("GHSA-35jh-r3h4-6jhm", Severity::High).with_cvss(7.2),
            ],
        );
        by_name.insert(
            "log4j-core".to_string(),
            vec![VulnerabilityRecord::new("CVE-2021-44228", Severity::Critical).with_cvss(10.0)],
        );
        Self {
            by_name,
            available: true,
        }
    }
}

#[async_trait]
impl VulnerabilitySource for StaticVulnerabilities {
    async fn fetch_vulnerabilities(
        &self,
        dependency: &DependencyKey,
    ) -> Result<Vec<VulnerabilityRecord>, CollectionError> {
        if !self.available {
            return Err(CollectionError::Api(ApiError::ServiceUnavailable));
        }
        Ok(self
            .by_name
            .get(&dependency.name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Advisory model giving the same answers to every dependency
pub struct CannedModel {
    pub available: bool,
}

#[async_trait]
impl AdvisoryModel for CannedModel {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, AdvisoryError> {
        if !self.available {
            return Err(AdvisoryError::MissingApiKey);
        }
        let text = if prompt.contains("## Collected signals") {
            r#"Overall risk is MEDIUM. {"risk_level": "MEDIUM", "confidence": 72}"#
        } else if prompt.contains("## Risk factors") {
            "Recommended version: 4.17.21\nAlternative version: 4.17.20\nAction: UPGRADE"
        } else {
            r#"```json
{"overall_health_score": 88, "maintenance_activity": "ACTIVE"}
```"#
        };
        Ok(text.to_string())
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub stats: Arc<CollectorStats>,
}

pub fn test_app(sources_available: bool, model_available: bool) -> TestApp {
    let stats = Arc::new(CollectorStats::new());
    let retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
    };

    let collector = SignalCollector::new(
        Arc::new(StaticRepositories {
            available: sources_available,
        }),
        Arc::new(StaticVulnerabilities {
            available: sources_available,
            ..StaticVulnerabilities::sample()
        }),
        stats.clone(),
    )
    .with_resilience(
        CircuitBreakerConfig::default(),
        CircuitBreakerConfig::default(),
        retry,
    );
    let advisor = Advisor::new(
        Arc::new(CannedModel {
            available: model_available,
        }),
        Duration::from_secs(5),
        stats.clone(),
    );
    let service = DependencyAnalysisServiceImpl::new(Arc::new(collector), Arc::new(advisor));

    let state = AppState::new(Arc::new(service), stats.clone());
    let mut config = Config::default();
    config.server.enable_docs = false;

    TestApp {
        router: create_router(state, &config),
        stats,
    }
}

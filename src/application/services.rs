//! Application services for orchestrating dependency analysis

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::errors::{AdvisoryError, ApplicationError, CollectionError};
use crate::domain::{
    AdvisoryOpinion, DependencyKey, DependencyReport, DomainError, Ecosystem, EcosystemInsights,
    ProjectSummary, Recommendation, RecommendationContext, RecommendationSynthesizer,
    RepositorySignal, RiskAssessment, RiskClassifier, ScoreCalculator, VulnerabilityRecord,
    VulnerabilitySummary, fallback_insights,
};
use crate::infrastructure::advisory::prompts;
use crate::infrastructure::{
    AdvisoryModel, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, GenerationOptions,
    RepositorySignalSource, ResponseParser, RetryConfig, VulnerabilitySource, retry_with_backoff,
};

/// Counters for degraded collections. Incremented exactly when a source
/// failure is replaced by an empty signal, an empty list or a fallback opinion.
#[derive(Debug, Default)]
pub struct CollectorStats {
    repository_failures: AtomicU64,
    vulnerability_failures: AtomicU64,
    advisory_fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorStatsSnapshot {
    pub repository_failures: u64,
    pub vulnerability_failures: u64,
    pub advisory_fallbacks: u64,
}

impl CollectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_repository_failure(&self) {
        self.repository_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vulnerability_failure(&self) {
        self.vulnerability_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_advisory_fallback(&self) {
        self.advisory_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CollectorStatsSnapshot {
        CollectorStatsSnapshot {
            repository_failures: self.repository_failures.load(Ordering::Relaxed),
            vulnerability_failures: self.vulnerability_failures.load(Ordering::Relaxed),
            advisory_fallbacks: self.advisory_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Normalizes repository and vulnerability sources into typed signals.
///
/// Never fails: a source failure yields the zero signal or an empty list and
/// is recorded in [`CollectorStats`].
pub struct SignalCollector {
    repositories: Arc<dyn RepositorySignalSource>,
    vulnerabilities: Arc<dyn VulnerabilitySource>,
    repository_breaker: CircuitBreaker,
    vulnerability_breaker: CircuitBreaker,
    retry: RetryConfig,
    search_limit: u32,
    stats: Arc<CollectorStats>,
}

impl SignalCollector {
    pub fn new(
        repositories: Arc<dyn RepositorySignalSource>,
        vulnerabilities: Arc<dyn VulnerabilitySource>,
        stats: Arc<CollectorStats>,
    ) -> Self {
        Self {
            repositories,
            vulnerabilities,
            repository_breaker: CircuitBreaker::new("github", CircuitBreakerConfig::default()),
            vulnerability_breaker: CircuitBreaker::new("osv", CircuitBreakerConfig::default()),
            retry: RetryConfig::default(),
            search_limit: 10,
            stats,
        }
    }

    pub fn with_resilience(
        mut self,
        repository_breaker: CircuitBreakerConfig,
        vulnerability_breaker: CircuitBreakerConfig,
        retry: RetryConfig,
    ) -> Self {
        self.repository_breaker = CircuitBreaker::new("github", repository_breaker);
        self.vulnerability_breaker = CircuitBreaker::new("osv", vulnerability_breaker);
        self.retry = retry;
        self
    }

    pub fn with_search_limit(mut self, search_limit: u32) -> Self {
        self.search_limit = search_limit.max(1);
        self
    }

    /// Repository signal for a dependency, sampled from the first repository the
    /// provider returns. `version` narrows hotfix detection.
    pub async fn collect_repository_signal(
        &self,
        dependency: &str,
        version: Option<&str>,
    ) -> RepositorySignal {
        let search = match self
            .guarded(&self.repository_breaker, || {
                self.repositories
                    .search_dependents(dependency, self.search_limit)
            })
            .await
        {
            Ok(search) => search,
            Err(e) => {
                warn!(dependency, error = %e, "Dependent search failed, using empty repository signal");
                self.stats.record_repository_failure();
                return RepositorySignal::empty();
            }
        };

        let mut signal = RepositorySignal {
            dependent_repositories: Some(search.total_count),
            sample_repositories: search.repositories.clone(),
            ..RepositorySignal::default()
        };

        let Some(sample) = search.repositories.first() else {
            debug!(dependency, "No repositories found for dependency");
            return signal;
        };
        signal.sample_repository = Some(sample.clone());

        let (stats, rollbacks, hotfix) = tokio::join!(
            self.guarded(&self.repository_breaker, || self
                .repositories
                .fetch_repository(sample)),
            self.guarded(&self.repository_breaker, || self
                .repositories
                .rollback_count(sample, version)),
            self.guarded(&self.repository_breaker, || self
                .repositories
                .has_hotfix(sample, version)),
        );

        let mut failed = false;
        match stats {
            Ok(stats) => {
                signal.stars = Some(stats.stars);
                signal.forks = Some(stats.forks);
                signal.open_issues = Some(stats.open_issues);
                signal.language = stats.language;
                signal.last_pushed_at = stats.pushed_at;
            }
            Err(e) => {
                warn!(dependency, repository = %sample, error = %e, "Repository stats unavailable");
                failed = true;
            }
        }
        match rollbacks {
            Ok(count) => signal.rollback_commits = Some(count),
            Err(e) => {
                warn!(dependency, repository = %sample, error = %e, "Rollback scan failed");
                failed = true;
            }
        }
        match hotfix {
            Ok(found) => signal.has_hotfix = Some(found),
            Err(e) => {
                warn!(dependency, repository = %sample, error = %e, "Hotfix scan failed");
                failed = true;
            }
        }
        if failed {
            self.stats.record_repository_failure();
        }

        signal
    }

    /// Known vulnerabilities for a dependency version, empty on failure
    pub async fn collect_vulnerabilities(&self, dependency: &DependencyKey) -> Vec<VulnerabilityRecord> {
        match self
            .guarded(&self.vulnerability_breaker, || {
                self.vulnerabilities.fetch_vulnerabilities(dependency)
            })
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(dependency = %dependency, error = %e, "Vulnerability lookup failed, assuming none");
                self.stats.record_vulnerability_failure();
                Vec::new()
            }
        }
    }

    pub async fn circuit_stats(&self) -> Vec<CircuitBreakerStats> {
        vec![
            self.repository_breaker.stats().await,
            self.vulnerability_breaker.stats().await,
        ]
    }

    /// Run a source call behind a circuit breaker with retries
    async fn guarded<'a, T, F, Fut>(
        &'a self,
        breaker: &'a CircuitBreaker,
        operation: F,
    ) -> Result<T, CollectionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CollectionError>>,
    {
        retry_with_backoff(&self.retry, || breaker.execute(&operation)).await
    }
}

/// Asks the advisory model for its opinion, degrading to fallbacks on failure
pub struct Advisor {
    model: Arc<dyn AdvisoryModel>,
    breaker: CircuitBreaker,
    stats: Arc<CollectorStats>,
}

impl Advisor {
    /// `timeout` bounds every single model call
    pub fn new(model: Arc<dyn AdvisoryModel>, timeout: Duration, stats: Arc<CollectorStats>) -> Self {
        Self::with_breaker(
            model,
            CircuitBreakerConfig {
                request_timeout: timeout,
                ..CircuitBreakerConfig::default()
            },
            stats,
        )
    }

    pub fn with_breaker(
        model: Arc<dyn AdvisoryModel>,
        config: CircuitBreakerConfig,
        stats: Arc<CollectorStats>,
    ) -> Self {
        Self {
            model,
            breaker: CircuitBreaker::new("advisory", config),
            stats,
        }
    }

    /// Risk analysis followed by an upgrade recommendation. If either call
    /// fails the whole opinion is the fallback one.
    pub async fn opinion(
        &self,
        dependency: &DependencyKey,
        target_version: &str,
        signal: &RepositorySignal,
        vulnerabilities: &[VulnerabilityRecord],
    ) -> AdvisoryOpinion {
        match self
            .try_opinion(dependency, target_version, signal, vulnerabilities)
            .await
        {
            Ok(opinion) => opinion,
            Err(e) => {
                warn!(dependency = %dependency, error = %e, "Advisory model unavailable, using fallback opinion");
                self.stats.record_advisory_fallback();
                AdvisoryOpinion::fallback()
            }
        }
    }

    /// Qualitative ecosystem insights, or the fixed fallback insights
    pub async fn ecosystem_insights(
        &self,
        dependency: &str,
        signal: &RepositorySignal,
        vulnerabilities: &[VulnerabilityRecord],
    ) -> EcosystemInsights {
        let prompt = prompts::ecosystem_assessment_prompt(
            dependency,
            &json!(signal).to_string(),
            &json!(VulnerabilitySummary::from_records(vulnerabilities)).to_string(),
        );

        match self.ask(&prompt, GenerationOptions::ECOSYSTEM_ASSESSMENT).await {
            Ok(text) => ResponseParser::insights(&text),
            Err(e) => {
                warn!(dependency, error = %e, "Ecosystem assessment unavailable");
                self.stats.record_advisory_fallback();
                fallback_insights()
            }
        }
    }

    pub async fn circuit_stats(&self) -> CircuitBreakerStats {
        self.breaker.stats().await
    }

    async fn try_opinion(
        &self,
        dependency: &DependencyKey,
        target_version: &str,
        signal: &RepositorySignal,
        vulnerabilities: &[VulnerabilityRecord],
    ) -> Result<AdvisoryOpinion, AdvisoryError> {
        let summary = VulnerabilitySummary::from_records(vulnerabilities);
        let context = json!({
            "package_manager": dependency.ecosystem,
            "current_version": dependency.version,
            "target_version": target_version,
            "repository": signal,
            "vulnerabilities": summary,
        });

        let analysis = self
            .ask(
                &prompts::risk_analysis_prompt(&dependency.name, target_version, &context.to_string()),
                GenerationOptions::RISK_ANALYSIS,
            )
            .await?;

        let risk_factors = json!({
            "rollback_count": signal.rollback_commits(),
            "has_hotfix": signal.has_hotfix(),
            "dependent_repositories": signal.dependent_repositories(),
            "vulnerability_count": summary.count,
            "highest_severity": summary.highest_severity(),
            "risk_analysis": analysis,
        });

        let recommendation = self
            .ask(
                &prompts::recommendation_prompt(
                    &dependency.name,
                    &dependency.version,
                    target_version,
                    &risk_factors.to_string(),
                ),
                GenerationOptions::RECOMMENDATION,
            )
            .await?;

        let confidence = ResponseParser::confidence(&analysis);
        Ok(AdvisoryOpinion::from_model_output(
            analysis,
            recommendation,
            confidence,
        ))
    }

    async fn ask(&self, prompt: &str, options: GenerationOptions) -> Result<String, AdvisoryError> {
        self.breaker
            .execute(|| self.model.generate(prompt, &options))
            .await
    }
}

/// Vulnerabilities of one dependency version with the derived security score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityLookup {
    pub dependency: String,
    pub version: String,
    pub package_manager: Ecosystem,
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    pub count: usize,
    pub security_score: f64,
}

/// Core analysis operations exposed to the API layer
#[async_trait]
pub trait DependencyAnalysisService: Send + Sync {
    /// Recommendation for moving `dependency` (at its current version) to `target_version`
    async fn analyze_and_recommend(
        &self,
        dependency: &DependencyKey,
        target_version: &str,
    ) -> Result<Recommendation, ApplicationError>;

    async fn assess_risk(&self, dependency: &DependencyKey) -> Result<RiskAssessment, ApplicationError>;

    /// Recommendations for a `packageManager:name:currentVersion` -> target version map.
    /// Entries that fail are skipped, the batch itself never fails.
    async fn batch_analyze(&self, targets: HashMap<String, String>) -> Vec<Recommendation>;

    async fn build_report(&self, dependency: &DependencyKey) -> Result<DependencyReport, ApplicationError>;

    async fn project_analysis(&self, dependency_keys: Vec<String>) -> ProjectSummary;

    async fn vulnerabilities(&self, dependency: &DependencyKey) -> VulnerabilityLookup;

    async fn repository_signal(&self, dependency: &str) -> RepositorySignal;

    async fn circuit_stats(&self) -> Vec<CircuitBreakerStats>;
}

/// Limits applied to batch and project fan-out
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub max_concurrent_analyses: usize,
    pub batch_timeout: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            batch_timeout: Duration::from_secs(300),
        }
    }
}

/// Implementation of the dependency analysis service
#[derive(Clone)]
pub struct DependencyAnalysisServiceImpl {
    collector: Arc<SignalCollector>,
    advisor: Arc<Advisor>,
    batch: BatchSettings,
}

impl DependencyAnalysisServiceImpl {
    pub fn new(collector: Arc<SignalCollector>, advisor: Arc<Advisor>) -> Self {
        Self {
            collector,
            advisor,
            batch: BatchSettings::default(),
        }
    }

    pub fn with_batch_settings(mut self, batch: BatchSettings) -> Self {
        self.batch = batch;
        self
    }

    /// Repository signal and vulnerabilities, both for the version in `dependency`
    async fn collect(&self, dependency: &DependencyKey) -> (RepositorySignal, Vec<VulnerabilityRecord>) {
        tokio::join!(
            self.collector
                .collect_repository_signal(&dependency.name, Some(&dependency.version)),
            self.collector.collect_vulnerabilities(dependency),
        )
    }

    /// Run `task` for every item on a JoinSet, at most `max_concurrent_analyses`
    /// at a time. When the batch deadline fires the remaining tasks are aborted
    /// and only the finished results are returned.
    async fn fan_out<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> Vec<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(Self, I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.batch.max_concurrent_analyses.max(1)));
        let mut join_set = JoinSet::new();

        for item in items {
            let semaphore = semaphore.clone();
            let work = task(self.clone(), item);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(work.await)
            });
        }

        let deadline = tokio::time::Instant::now() + self.batch.batch_timeout;
        let mut results = Vec::with_capacity(total);

        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok(Some(result)))) => results.push(result),
                Ok(Some(Ok(None))) => {}
                Ok(Some(Err(e))) => warn!("Analysis task failed: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Batch deadline of {:?} reached, aborting {} outstanding analyses",
                        self.batch.batch_timeout,
                        join_set.len()
                    );
                    join_set.abort_all();
                    break;
                }
            }
        }

        results
    }
}

#[async_trait]
impl DependencyAnalysisService for DependencyAnalysisServiceImpl {
    async fn analyze_and_recommend(
        &self,
        dependency: &DependencyKey,
        target_version: &str,
    ) -> Result<Recommendation, ApplicationError> {
        let target_version = target_version.trim();
        if target_version.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "target_version".to_string(),
                message: "Target version cannot be empty".to_string(),
            }
            .into());
        }

        info!(dependency = %dependency, target_version, "Analyzing dependency upgrade");

        let target = DependencyKey {
            version: target_version.to_string(),
            ..dependency.clone()
        };
        let (signal, vulnerabilities) = self.collect(&target).await;
        let opinion = self
            .advisor
            .opinion(dependency, target_version, &signal, &vulnerabilities)
            .await;

        let calculator = ScoreCalculator::new();
        let context = RecommendationContext {
            package_manager: dependency.ecosystem,
            dependency: &dependency.name,
            current_version: &dependency.version,
            target_version,
            security_score: calculator.security_score(&vulnerabilities),
            stability_score: calculator.stability_score(&signal),
            signal: &signal,
            vulnerabilities: &vulnerabilities,
            opinion: &opinion,
        };

        let recommendation = RecommendationSynthesizer::new().synthesize(&context, Utc::now());
        info!(
            dependency = %dependency,
            risk_level = %recommendation.risk_level,
            action = %recommendation.recommendation_type,
            "Recommendation generated"
        );
        Ok(recommendation)
    }

    async fn assess_risk(&self, dependency: &DependencyKey) -> Result<RiskAssessment, ApplicationError> {
        let (signal, vulnerabilities) = self.collect(dependency).await;
        let insights = self
            .advisor
            .ecosystem_insights(&dependency.name, &signal, &vulnerabilities)
            .await;

        let assessment =
            RiskAssessment::new(dependency.clone(), &signal, &vulnerabilities, &insights, Utc::now());
        debug!(
            dependency = %dependency,
            score = assessment.score,
            level = %assessment.level,
            "Risk assessed"
        );
        Ok(assessment)
    }

    async fn batch_analyze(&self, targets: HashMap<String, String>) -> Vec<Recommendation> {
        let requested = targets.len();
        let mut entries = Vec::with_capacity(requested);
        for (key, target_version) in targets {
            match DependencyKey::parse(&key) {
                Ok(dependency) => entries.push((dependency, target_version)),
                Err(e) => warn!(key = %key, error = %e, "Skipping malformed batch entry"),
            }
        }

        let results = self
            .fan_out(entries, |service, (dependency, target_version)| async move {
                match service
                    .analyze_and_recommend(&dependency, &target_version)
                    .await
                {
                    Ok(recommendation) => Some(recommendation),
                    Err(e) => {
                        warn!(dependency = %dependency, error = %e, "Skipping failed batch entry");
                        None
                    }
                }
            })
            .await;

        let recommendations: Vec<Recommendation> = results.into_iter().flatten().collect();
        info!(
            "Batch analysis produced {} of {} recommendations",
            recommendations.len(),
            requested
        );
        recommendations
    }

    async fn build_report(&self, dependency: &DependencyKey) -> Result<DependencyReport, ApplicationError> {
        let (signal, vulnerabilities) = self.collect(dependency).await;
        let insights = self
            .advisor
            .ecosystem_insights(&dependency.name, &signal, &vulnerabilities)
            .await;

        let now = Utc::now();
        let risk_assessment =
            RiskAssessment::new(dependency.clone(), &signal, &vulnerabilities, &insights, now);

        Ok(DependencyReport {
            dependency: dependency.name.clone(),
            version: dependency.version.clone(),
            package_manager: dependency.ecosystem,
            vulnerability_summary: VulnerabilitySummary::from_records(&vulnerabilities),
            security_score: risk_assessment.scores.security,
            stability_score: risk_assessment.scores.stability,
            overall_risk_level: RiskClassifier::new().classify(risk_assessment.score),
            repository_signal: signal,
            vulnerabilities,
            risk_assessment,
            ecosystem_insights: insights,
            generated_at: now,
        })
    }

    async fn project_analysis(&self, dependency_keys: Vec<String>) -> ProjectSummary {
        let requested = dependency_keys.len();
        let mut failed = Vec::new();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for key in dependency_keys {
            if !seen.insert(key.clone()) {
                continue;
            }
            match DependencyKey::parse(&key) {
                Ok(dependency) => entries.push((key, dependency)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping malformed project dependency");
                    failed.push(key);
                }
            }
        }

        let pending: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
        let results = self
            .fan_out(entries, |service, (key, dependency)| async move {
                let assessment = service.assess_risk(&dependency).await;
                (key, assessment)
            })
            .await;

        let mut assessments = BTreeMap::new();
        for (key, result) in results {
            match result {
                Ok(assessment) => {
                    assessments.insert(key, assessment);
                }
                Err(e) => warn!(key = %key, error = %e, "Project dependency assessment failed"),
            }
        }

        // Anything neither assessed nor already failed did not finish in time
        failed.extend(
            pending
                .into_iter()
                .filter(|key| !assessments.contains_key(key)),
        );

        ProjectSummary::from_assessments(requested, assessments, failed)
    }

    async fn vulnerabilities(&self, dependency: &DependencyKey) -> VulnerabilityLookup {
        let vulnerabilities = self.collector.collect_vulnerabilities(dependency).await;
        VulnerabilityLookup {
            dependency: dependency.name.clone(),
            version: dependency.version.clone(),
            package_manager: dependency.ecosystem,
            count: vulnerabilities.len(),
            security_score: ScoreCalculator::new().security_score(&vulnerabilities),
            vulnerabilities,
        }
    }

    async fn repository_signal(&self, dependency: &str) -> RepositorySignal {
        self.collector.collect_repository_signal(dependency, None).await
    }

    async fn circuit_stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats = self.collector.circuit_stats().await;
        stats.push(self.advisor.circuit_stats().await);
        stats
    }
}

//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::{CollectorStatsSnapshot, VulnerabilityLookup};
use crate::domain::{
    DependencyReport, ProjectSummary, Recommendation, RepositorySignal, RiskAssessment, SubScores,
    VulnerabilityRecord, VulnerabilitySummary,
};

/// Request model for a single upgrade analysis
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Package manager the dependency comes from
    #[schema(example = "npm")]
    pub package_manager: String,

    #[schema(example = "lodash")]
    pub dependency: String,

    #[schema(example = "4.17.15")]
    pub current_version: String,

    #[schema(example = "4.17.21")]
    pub target_version: String,
}

/// Query parameters addressing one dependency version
#[derive(Debug, Deserialize, IntoParams)]
pub struct DependencyQuery {
    /// Package manager, e.g. `npm`, `pypi`, `maven`
    pub package_manager: String,
    pub dependency: String,
    pub version: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RepositorySignalQuery {
    pub dependency: String,
}

/// Map of `packageManager:name:currentVersion` keys to target versions
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(example = json!({"npm:lodash:4.17.15": "4.17.21", "pypi:requests:2.25.0": "2.31.0"}))]
pub struct BatchAnalyzeRequest(pub HashMap<String, String>);

/// List of `packageManager:name:version` keys
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(example = json!(["npm:express:4.17.1", "maven:org.slf4j:slf4j-api:2.0.9"]))]
pub struct ProjectAnalysisRequest(pub Vec<String>);

/// DTO for an upgrade recommendation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationDto {
    pub id: Uuid,
    #[schema(example = "npm")]
    pub package_manager: String,
    #[schema(example = "lodash")]
    pub dependency: String,
    #[schema(example = "4.17.15")]
    pub current_version: String,
    #[schema(example = "4.17.21")]
    pub target_version: String,
    pub recommended_version: String,
    pub alternative_version: Option<String>,
    /// LOW, MEDIUM, HIGH, CRITICAL or UNKNOWN
    #[schema(example = "MEDIUM")]
    pub risk_level: String,
    /// UPGRADE, HOLD, DOWNGRADE or ALTERNATIVE
    #[schema(example = "UPGRADE")]
    pub recommendation_type: String,
    #[schema(example = 90.0)]
    pub confidence_score: f64,
    pub has_breaking_changes: bool,
    pub has_security_fixes: bool,
    pub has_performance_improvements: bool,
    pub has_bug_fixes: bool,
    pub estimated_savings_hours: u32,
    pub reasoning: String,
    /// AI_HYBRID or RULE_BASED
    #[schema(example = "AI_HYBRID")]
    pub generated_by: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Recommendation> for RecommendationDto {
    fn from(r: Recommendation) -> Self {
        Self {
            id: r.id,
            package_manager: r.package_manager.to_string(),
            dependency: r.dependency,
            current_version: r.current_version,
            target_version: r.target_version,
            recommended_version: r.recommended_version,
            alternative_version: r.alternative_version,
            risk_level: r.risk_level.to_string(),
            recommendation_type: r.recommendation_type.to_string(),
            confidence_score: r.confidence_score,
            has_breaking_changes: r.has_breaking_changes,
            has_security_fixes: r.has_security_fixes,
            has_performance_improvements: r.has_performance_improvements,
            has_bug_fixes: r.has_bug_fixes,
            estimated_savings_hours: r.estimated_savings_hours,
            reasoning: r.reasoning,
            generated_by: r.generated_by.to_string(),
            generated_at: r.generated_at,
            expires_at: r.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubScoresDto {
    pub security: f64,
    pub stability: f64,
    pub performance: f64,
    pub community_health: f64,
    pub maintenance: f64,
    pub adoption: f64,
}

impl From<SubScores> for SubScoresDto {
    fn from(s: SubScores) -> Self {
        Self {
            security: s.security,
            stability: s.stability,
            performance: s.performance,
            community_health: s.community_health,
            maintenance: s.maintenance,
            adoption: s.adoption,
        }
    }
}

/// DTO for a risk assessment of one dependency version
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RiskAssessmentDto {
    pub id: Uuid,
    #[schema(example = "npm:express:4.17.1")]
    pub dependency: String,
    #[schema(example = "OVERALL")]
    pub assessment_type: String,
    /// Composite score, higher is safer
    #[schema(example = 85.8)]
    pub score: f64,
    #[schema(example = "LOW")]
    pub level: String,
    pub scores: SubScoresDto,
    pub vulnerability_count: usize,
    pub rollback_count: u32,
    pub hotfix_count: u32,
    pub issue_count: u64,
    /// JSON document of every input that went into the score
    pub factors: String,
    pub ai_explanation: String,
    pub assessed_at: DateTime<Utc>,
}

impl From<RiskAssessment> for RiskAssessmentDto {
    fn from(a: RiskAssessment) -> Self {
        Self {
            id: a.id,
            dependency: a.dependency.to_string(),
            assessment_type: a.assessment_type,
            score: a.score,
            level: a.level.to_string(),
            scores: a.scores.into(),
            vulnerability_count: a.vulnerability_count,
            rollback_count: a.rollback_count,
            hotfix_count: a.hotfix_count,
            issue_count: a.issue_count,
            factors: a.factors,
            ai_explanation: a.ai_explanation,
            assessed_at: a.assessed_at,
        }
    }
}

/// DTO for vulnerability information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VulnerabilityDto {
    #[schema(example = "GHSA-35jh-r3h4-6jhm")]
    pub id: String,
    #[schema(example = "Command Injection in lodash")]
    pub summary: String,
    #[schema(example = "HIGH")]
    pub severity: String,
    #[schema(example = 7.2)]
    pub cvss_score: Option<f64>,
    #[schema(example = ">=0, <4.17.21")]
    pub affected_range: Option<String>,
}

impl From<VulnerabilityRecord> for VulnerabilityDto {
    fn from(v: VulnerabilityRecord) -> Self {
        Self {
            id: v.id,
            summary: v.summary,
            severity: v.severity.to_string(),
            cvss_score: v.cvss_score,
            affected_range: v.affected_range,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VulnerabilitySummaryDto {
    pub count: usize,
    /// Count per observed severity
    pub severity_histogram: BTreeMap<String, usize>,
    pub average_cvss_score: f64,
}

impl From<VulnerabilitySummary> for VulnerabilitySummaryDto {
    fn from(s: VulnerabilitySummary) -> Self {
        Self {
            count: s.count,
            severity_histogram: s
                .severity_histogram
                .into_iter()
                .map(|(severity, count)| (severity.to_string(), count))
                .collect(),
            average_cvss_score: s.average_cvss_score,
        }
    }
}

/// Vulnerabilities of one dependency version
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VulnerabilityListResponse {
    pub dependency: String,
    pub version: String,
    pub package_manager: String,
    pub vulnerabilities: Vec<VulnerabilityDto>,
    pub count: usize,
    #[schema(example = 92.0)]
    pub security_score: f64,
}

impl From<VulnerabilityLookup> for VulnerabilityListResponse {
    fn from(l: VulnerabilityLookup) -> Self {
        Self {
            dependency: l.dependency,
            version: l.version,
            package_manager: l.package_manager.to_string(),
            vulnerabilities: l.vulnerabilities.into_iter().map(Into::into).collect(),
            count: l.count,
            security_score: l.security_score,
        }
    }
}

/// Repository health signal; absent metrics were not collected
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RepositorySignalDto {
    #[schema(example = "lodash/lodash")]
    pub sample_repository: Option<String>,
    pub sample_repositories: Vec<String>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub open_issues: Option<u64>,
    pub language: Option<String>,
    pub rollback_commits: Option<u32>,
    pub has_hotfix: Option<bool>,
    pub dependent_repositories: Option<u64>,
    pub last_pushed_at: Option<DateTime<Utc>>,
}

impl From<RepositorySignal> for RepositorySignalDto {
    fn from(s: RepositorySignal) -> Self {
        Self {
            sample_repository: s.sample_repository,
            sample_repositories: s.sample_repositories,
            stars: s.stars,
            forks: s.forks,
            open_issues: s.open_issues,
            language: s.language,
            rollback_commits: s.rollback_commits,
            has_hotfix: s.has_hotfix,
            dependent_repositories: s.dependent_repositories,
            last_pushed_at: s.last_pushed_at,
        }
    }
}

/// Full report for a single dependency version
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DependencyReportDto {
    pub dependency: String,
    pub version: String,
    pub package_manager: String,
    pub repository_signal: RepositorySignalDto,
    pub vulnerabilities: Vec<VulnerabilityDto>,
    pub vulnerability_summary: VulnerabilitySummaryDto,
    pub risk_assessment: RiskAssessmentDto,
    pub security_score: f64,
    pub stability_score: f64,
    pub overall_risk_level: String,
    /// Qualitative assessment returned by the advisory model
    #[schema(value_type = Object)]
    pub ecosystem_insights: Value,
    pub generated_at: DateTime<Utc>,
}

impl From<DependencyReport> for DependencyReportDto {
    fn from(r: DependencyReport) -> Self {
        Self {
            dependency: r.dependency,
            version: r.version,
            package_manager: r.package_manager.to_string(),
            repository_signal: r.repository_signal.into(),
            vulnerabilities: r.vulnerabilities.into_iter().map(Into::into).collect(),
            vulnerability_summary: r.vulnerability_summary.into(),
            risk_assessment: r.risk_assessment.into(),
            security_score: r.security_score,
            stability_score: r.stability_score,
            overall_risk_level: r.overall_risk_level.to_string(),
            ecosystem_insights: Value::Object(r.ecosystem_insights),
            generated_at: r.generated_at,
        }
    }
}

/// Risk roll-up across a project's dependencies
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummaryDto {
    pub dependencies_requested: usize,
    pub dependencies_analyzed: usize,
    pub failed_dependencies: Vec<String>,
    pub total_vulnerabilities: usize,
    /// Mean composite score over the analyzed dependencies
    pub average_risk_score: f64,
    #[schema(example = "LOW")]
    pub overall_project_risk: String,
    pub risk_assessments: BTreeMap<String, RiskAssessmentDto>,
    pub recommendations: String,
}

impl From<ProjectSummary> for ProjectSummaryDto {
    fn from(p: ProjectSummary) -> Self {
        Self {
            dependencies_requested: p.dependencies_requested,
            dependencies_analyzed: p.dependencies_analyzed,
            failed_dependencies: p.failed_dependencies,
            total_vulnerabilities: p.total_vulnerabilities,
            average_risk_score: p.average_risk_score,
            overall_project_risk: p.overall_project_risk.to_string(),
            risk_assessments: p
                .risk_assessments
                .into_iter()
                .map(|(key, assessment)| (key, assessment.into()))
                .collect(),
            recommendations: p.recommendations,
        }
    }
}

/// Collector degradation counters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CollectorStatsDto {
    pub repository_failures: u64,
    pub vulnerability_failures: u64,
    pub advisory_fallbacks: u64,
}

impl From<CollectorStatsSnapshot> for CollectorStatsDto {
    fn from(s: CollectorStatsSnapshot) -> Self {
        Self {
            repository_failures: s.repository_failures,
            vulnerability_failures: s.vulnerability_failures,
            advisory_fallbacks: s.advisory_fallbacks,
        }
    }
}

/// Error response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "INVALID_DEPENDENCY_KEY")]
    pub code: String,

    #[schema(example = "Dependency key must look like packageManager:name:version")]
    pub message: String,

    #[schema(value_type = Object)]
    pub details: Option<Value>,

    pub request_id: Uuid,

    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,

    #[schema(example = "0.1.0")]
    pub version: String,

    pub timestamp: DateTime<Utc>,

    #[schema(value_type = Object)]
    pub details: Option<Value>,
}

//! Domain entities representing core business concepts

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::errors::DomainError;
use super::services::{
    ACTION_RULES, RISK_LEVEL_RULES, RiskClassifier, ScoreCalculator, clamp_score,
    extract_alternative_version,
};
use super::value_objects::*;

/// How long a recommendation stays valid before it has to be regenerated
pub const RECOMMENDATION_TTL_DAYS: i64 = 7;

/// Confidence assigned to a real advisory opinion that did not report one
pub const DEFAULT_ADVISORY_CONFIDENCE: f64 = 50.0;

/// Free-form insights returned by the advisory model's ecosystem assessment
pub type EcosystemInsights = Map<String, Value>;

/// Insights used when the ecosystem assessment could not be obtained
pub fn fallback_insights() -> EcosystemInsights {
    let mut insights = Map::new();
    insights.insert("risk_level".to_string(), json!("UNKNOWN"));
    insights.insert("confidence".to_string(), json!(0.0));
    insights.insert("summary".to_string(), json!("AI assessment unavailable"));
    insights
}

/// Repository health metrics collected for a dependency.
///
/// All fields are optional. Absent values read as zero/false through the
/// accessor methods so that missing data never leaks into arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySignal {
    /// Representative repository the metrics were sampled from
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

impl RepositorySignal {
    /// Zero-valued signal used when nothing could be collected
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn stars(&self) -> u64 {
        self.stars.unwrap_or(0)
    }

    pub fn forks(&self) -> u64 {
        self.forks.unwrap_or(0)
    }

    pub fn open_issues(&self) -> u64 {
        self.open_issues.unwrap_or(0)
    }

    pub fn rollback_commits(&self) -> u32 {
        self.rollback_commits.unwrap_or(0)
    }

    pub fn has_hotfix(&self) -> bool {
        self.has_hotfix.unwrap_or(false)
    }

    pub fn dependent_repositories(&self) -> u64 {
        self.dependent_repositories.unwrap_or(0)
    }
}

/// A known vulnerability affecting a package version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub id: String,
    pub summary: String,
    pub severity: Severity,
    /// CVSS base score, 0.0 - 10.0
    pub cvss_score: Option<f64>,
    pub affected_range: Option<String>,
}

impl VulnerabilityRecord {
    pub fn new(id: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            summary: String::new(),
            severity,
            cvss_score: None,
            affected_range: None,
        }
    }

    pub fn with_cvss(mut self, score: f64) -> Self {
        self.cvss_score = Some(score.clamp(0.0, 10.0));
        self
    }
}

/// Aggregate view over a list of vulnerability records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilitySummary {
    pub count: usize,
    /// Only severities that were actually observed appear as keys
    pub severity_histogram: BTreeMap<Severity, usize>,
    pub average_cvss_score: f64,
}

impl VulnerabilitySummary {
    pub fn from_records(records: &[VulnerabilityRecord]) -> Self {
        let mut severity_histogram = BTreeMap::new();
        for record in records {
            *severity_histogram.entry(record.severity).or_insert(0) += 1;
        }

        let scored: Vec<f64> = records.iter().filter_map(|r| r.cvss_score).collect();
        let average_cvss_score = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        };

        Self {
            count: records.len(),
            severity_histogram,
            average_cvss_score,
        }
    }

    pub fn has_critical(&self) -> bool {
        self.severity_histogram.contains_key(&Severity::Critical)
    }

    /// Get the highest severity level present
    pub fn highest_severity(&self) -> Option<Severity> {
        self.severity_histogram.keys().next_back().copied()
    }
}

/// Qualitative verdict produced by the advisory model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryOpinion {
    pub risk_level: RiskLevel,
    pub action: RecommendationType,
    /// 0 - 100
    pub confidence: f64,
    /// Risk analysis text, kept verbatim for auditing
    pub analysis: String,
    /// Upgrade recommendation text, kept verbatim for auditing
    pub recommendation: String,
    pub alternative_version: Option<String>,
    /// True when the model could not be reached or its output was unusable
    pub is_fallback: bool,
}

impl AdvisoryOpinion {
    /// Build an opinion from the raw analysis and recommendation texts
    pub fn from_model_output(
        analysis: String,
        recommendation: String,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            risk_level: RISK_LEVEL_RULES.classify(&analysis),
            action: ACTION_RULES.classify(&recommendation),
            confidence: confidence
                .map(clamp_score)
                .unwrap_or(DEFAULT_ADVISORY_CONFIDENCE),
            alternative_version: extract_alternative_version(&recommendation),
            analysis,
            recommendation,
            is_fallback: false,
        }
    }

    /// Opinion used when the advisory model failed
    pub fn fallback() -> Self {
        Self {
            risk_level: RiskLevel::Unknown,
            action: RecommendationType::Hold,
            confidence: 0.0,
            analysis: "AI analysis unavailable. Please check manually.".to_string(),
            recommendation: "Hold: Unable to generate AI recommendation. Please review manually."
                .to_string(),
            alternative_version: None,
            is_fallback: true,
        }
    }

    pub fn mentions_breaking_changes(&self) -> bool {
        self.analysis.to_lowercase().contains("breaking")
    }

    pub fn mentions_performance(&self) -> bool {
        let text = format!("{}\n{}", self.analysis, self.recommendation).to_lowercase();
        text.contains("performance")
    }

    pub fn mentions_bug_fixes(&self) -> bool {
        let text = format!("{}\n{}", self.analysis, self.recommendation).to_lowercase();
        text.contains("bug fix") || text.contains("bugfix")
    }
}

/// The six bounded sub-scores of a risk assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub security: f64,
    pub stability: f64,
    pub performance: f64,
    pub community_health: f64,
    pub maintenance: f64,
    pub adoption: f64,
}

impl SubScores {
    pub fn compute(signal: &RepositorySignal, vulnerabilities: &[VulnerabilityRecord]) -> Self {
        let calculator = ScoreCalculator::new();
        Self {
            security: calculator.security_score(vulnerabilities),
            stability: calculator.stability_score(signal),
            performance: calculator.performance_score(signal),
            community_health: calculator.community_health_score(signal),
            maintenance: calculator.maintenance_score(signal),
            adoption: calculator.adoption_score(signal),
        }
    }

    /// Composite score from the weighted security, stability and performance scores
    pub fn overall(&self) -> f64 {
        ScoreCalculator::new().overall_score(self.security, self.stability, self.performance)
    }
}

/// Risk evaluation of one dependency version. A re-assessment creates a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: Uuid,
    pub dependency: DependencyKey,
    pub assessment_type: String,
    /// Composite score, 0 - 100
    pub score: f64,
    pub level: RiskLevel,
    pub scores: SubScores,
    pub vulnerability_count: usize,
    pub rollback_count: u32,
    pub hotfix_count: u32,
    pub issue_count: u64,
    /// JSON dump of every input that went into the assessment
    pub factors: String,
    pub ai_explanation: String,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn new(
        dependency: DependencyKey,
        signal: &RepositorySignal,
        vulnerabilities: &[VulnerabilityRecord],
        insights: &EcosystemInsights,
        assessed_at: DateTime<Utc>,
    ) -> Self {
        let scores = SubScores::compute(signal, vulnerabilities);
        let score = scores.overall();

        let factors = json!({
            "repository": signal,
            "vulnerability_count": vulnerabilities.len(),
            "vulnerabilities": VulnerabilitySummary::from_records(vulnerabilities),
            "ai_assessment": insights,
        })
        .to_string();

        Self {
            id: Uuid::new_v4(),
            dependency,
            assessment_type: "OVERALL".to_string(),
            score,
            level: RiskClassifier::new().classify(score),
            scores,
            vulnerability_count: vulnerabilities.len(),
            rollback_count: signal.rollback_commits(),
            hotfix_count: u32::from(signal.has_hotfix()),
            issue_count: signal.open_issues(),
            factors,
            ai_explanation: Value::Object(insights.clone()).to_string(),
            assessed_at,
        }
    }
}

/// Upgrade recommendation for a dependency.
///
/// Immutable once issued, apart from the one-way applied transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub package_manager: Ecosystem,
    pub dependency: String,
    pub current_version: String,
    pub target_version: String,
    pub recommended_version: String,
    pub alternative_version: Option<String>,
    pub risk_level: RiskLevel,
    pub recommendation_type: RecommendationType,
    /// 0 - 100
    pub confidence_score: f64,
    pub has_breaking_changes: bool,
    pub has_security_fixes: bool,
    pub has_performance_improvements: bool,
    pub has_bug_fixes: bool,
    pub estimated_savings_hours: u32,
    pub reasoning: String,
    pub generated_by: GeneratedBy,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub(super) applied: bool,
    pub(super) applied_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    pub fn expiry_for(generated_at: DateTime<Utc>) -> DateTime<Utc> {
        generated_at + Duration::days(RECOMMENDATION_TTL_DAYS)
    }

    /// An expired recommendation must not be reused; callers regenerate it
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    /// Record that the recommendation was acted upon. Can only happen once.
    pub fn mark_applied(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.applied {
            return Err(DomainError::AlreadyApplied {
                id: self.id.to_string(),
            });
        }
        self.applied = true;
        self.applied_at = Some(at);
        Ok(())
    }
}

/// Full report for a single dependency version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    pub dependency: String,
    pub version: String,
    pub package_manager: Ecosystem,
    pub repository_signal: RepositorySignal,
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    pub vulnerability_summary: VulnerabilitySummary,
    pub risk_assessment: RiskAssessment,
    pub security_score: f64,
    pub stability_score: f64,
    pub overall_risk_level: RiskLevel,
    pub ecosystem_insights: EcosystemInsights,
    pub generated_at: DateTime<Utc>,
}

/// Risk roll-up across the dependencies of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub dependencies_requested: usize,
    pub dependencies_analyzed: usize,
    pub failed_dependencies: Vec<String>,
    pub total_vulnerabilities: usize,
    pub average_risk_score: f64,
    pub overall_project_risk: RiskLevel,
    pub risk_assessments: BTreeMap<String, RiskAssessment>,
    pub recommendations: String,
}

impl ProjectSummary {
    /// Roll up successful assessments. Failed keys are listed but never
    /// averaged in as zero-score dependencies.
    pub fn from_assessments(
        dependencies_requested: usize,
        risk_assessments: BTreeMap<String, RiskAssessment>,
        mut failed_dependencies: Vec<String>,
    ) -> Self {
        failed_dependencies.sort();

        let analyzed = risk_assessments.len();
        let total_vulnerabilities = risk_assessments
            .values()
            .map(|a| a.vulnerability_count)
            .sum();

        let (average_risk_score, overall_project_risk) = if analyzed == 0 {
            (0.0, RiskLevel::Unknown)
        } else {
            let mean = risk_assessments.values().map(|a| a.score).sum::<f64>() / analyzed as f64;
            (mean, RiskClassifier::new().classify(mean))
        };

        Self {
            dependencies_requested,
            dependencies_analyzed: analyzed,
            failed_dependencies,
            total_vulnerabilities,
            average_risk_score,
            overall_project_risk,
            risk_assessments,
            recommendations: "Run individual analysis for upgrade recommendations".to_string(),
        }
    }
}

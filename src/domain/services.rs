//! Domain services containing business logic

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use super::entities::{AdvisoryOpinion, Recommendation, RepositorySignal, VulnerabilityRecord};
use super::value_objects::*;

/// Stability score of a repository with no rollback or hotfix history
pub const STABILITY_BASELINE: f64 = 80.0;

/// Performance data is not collected yet, every dependency gets this value
pub const PERFORMANCE_PLACEHOLDER: f64 = 85.0;

/// Clamp a score into the 0 - 100 range. NaN reads as 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Service computing the bounded sub-scores and the composite score
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub const SECURITY_WEIGHT: f64 = 0.4;
    pub const STABILITY_WEIGHT: f64 = 0.4;
    pub const PERFORMANCE_WEIGHT: f64 = 0.2;

    pub fn new() -> Self {
        Self
    }

    /// Penalty subtracted from the security score for one vulnerability
    pub fn severity_penalty(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => 25.0,
            Severity::High => 15.0,
            Severity::Medium => 8.0,
            Severity::Low => 3.0,
            Severity::None => 0.0,
        }
    }

    /// 100 minus a per-vulnerability severity penalty
    pub fn security_score(&self, vulnerabilities: &[VulnerabilityRecord]) -> f64 {
        let penalty: f64 = vulnerabilities
            .iter()
            .map(|v| self.severity_penalty(v.severity))
            .sum();
        clamp_score(100.0 - penalty)
    }

    /// Baseline minus 5 per rollback commit, minus 10 once if a hotfix was seen
    pub fn stability_score(&self, signal: &RepositorySignal) -> f64 {
        let mut score = STABILITY_BASELINE - 5.0 * f64::from(signal.rollback_commits());
        if signal.has_hotfix() {
            score -= 10.0;
        }
        clamp_score(score)
    }

    pub fn performance_score(&self, _signal: &RepositorySignal) -> f64 {
        PERFORMANCE_PLACEHOLDER
    }

    /// Base 70, boosted by stars and forks
    pub fn community_health_score(&self, signal: &RepositorySignal) -> f64 {
        let mut score: f64 = 70.0;
        let stars = signal.stars();
        if stars > 1000 {
            score += 20.0;
        } else if stars > 100 {
            score += 10.0;
        }
        if signal.forks() > 100 {
            score += 10.0;
        }
        clamp_score(score)
    }

    /// Base 75, reduced by a large open issue backlog
    pub fn maintenance_score(&self, signal: &RepositorySignal) -> f64 {
        let open_issues = signal.open_issues();
        let penalty = if open_issues > 100 {
            20.0
        } else if open_issues > 50 {
            10.0
        } else {
            0.0
        };
        clamp_score(75.0 - penalty)
    }

    /// Step function of the number of dependent repositories
    pub fn adoption_score(&self, signal: &RepositorySignal) -> f64 {
        match signal.dependent_repositories() {
            n if n > 1000 => 95.0,
            n if n > 100 => 80.0,
            n if n > 10 => 65.0,
            _ => 50.0,
        }
    }

    /// Weighted composite of the security, stability and performance scores.
    /// Inputs are clamped first so the result is always within 0 - 100.
    pub fn overall_score(&self, security: f64, stability: f64, performance: f64) -> f64 {
        clamp_score(
            clamp_score(security) * Self::SECURITY_WEIGHT
                + clamp_score(stability) * Self::STABILITY_WEIGHT
                + clamp_score(performance) * Self::PERFORMANCE_WEIGHT,
        )
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a composite score onto a risk band
pub struct RiskClassifier;

impl RiskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// >=80 LOW, >=60 MEDIUM, >=40 HIGH, anything lower CRITICAL
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= 80.0 {
            RiskLevel::Low
        } else if score >= 60.0 {
            RiskLevel::Medium
        } else if score >= 40.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered keyword table mapping free text onto a label.
///
/// The first keyword found in the text wins, so table order is the precedence.
pub struct KeywordRules<L: 'static> {
    rules: &'static [(&'static str, L)],
    fallback: L,
}

impl<L: Copy> KeywordRules<L> {
    pub const fn new(rules: &'static [(&'static str, L)], fallback: L) -> Self {
        Self { rules, fallback }
    }

    pub fn classify(&self, text: &str) -> L {
        self.rules
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, label)| *label)
            .unwrap_or(self.fallback)
    }
}

pub const RISK_LEVEL_RULES: KeywordRules<RiskLevel> = KeywordRules::new(
    &[
        ("CRITICAL", RiskLevel::Critical),
        ("HIGH", RiskLevel::High),
        ("MEDIUM", RiskLevel::Medium),
        ("LOW", RiskLevel::Low),
    ],
    RiskLevel::Unknown,
);

pub const ACTION_RULES: KeywordRules<RecommendationType> = KeywordRules::new(
    &[
        ("UPGRADE", RecommendationType::Upgrade),
        ("HOLD", RecommendationType::Hold),
        ("DOWNGRADE", RecommendationType::Downgrade),
        ("ALTERNATIVE", RecommendationType::Alternative),
    ],
    RecommendationType::Hold,
);

static ALTERNATIVE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)alternative(?:\s+version)?\s*[:=]?\s*v?(\d+(?:\.\d+)*(?:[-+][0-9A-Za-z.-]+)?)")
        .expect("alternative version pattern is valid")
});

/// Pull a version number following "alternative" out of recommendation text
pub fn extract_alternative_version(text: &str) -> Option<String> {
    ALTERNATIVE_VERSION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Inputs for synthesizing a recommendation
pub struct RecommendationContext<'a> {
    pub package_manager: Ecosystem,
    pub dependency: &'a str,
    pub current_version: &'a str,
    pub target_version: &'a str,
    pub security_score: f64,
    pub stability_score: f64,
    pub signal: &'a RepositorySignal,
    pub vulnerabilities: &'a [VulnerabilityRecord],
    pub opinion: &'a AdvisoryOpinion,
}

/// Combines scores, vulnerabilities and the advisory opinion into a recommendation
pub struct RecommendationSynthesizer;

impl RecommendationSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(
        &self,
        ctx: &RecommendationContext<'_>,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let opinion = ctx.opinion;

        Recommendation {
            id: Uuid::new_v4(),
            package_manager: ctx.package_manager,
            dependency: ctx.dependency.to_string(),
            current_version: ctx.current_version.to_string(),
            target_version: ctx.target_version.to_string(),
            recommended_version: ctx.target_version.to_string(),
            alternative_version: opinion.alternative_version.clone(),
            risk_level: self.risk_level(ctx.vulnerabilities, opinion),
            recommendation_type: opinion.action,
            confidence_score: self.confidence_score(ctx.vulnerabilities, ctx.signal, opinion),
            has_breaking_changes: self.has_breaking_changes(ctx.signal, opinion),
            has_security_fixes: !ctx.vulnerabilities.is_empty(),
            has_performance_improvements: opinion.mentions_performance(),
            has_bug_fixes: opinion.mentions_bug_fixes() || ctx.signal.has_hotfix(),
            estimated_savings_hours: self.estimated_hours(ctx.vulnerabilities, ctx.signal),
            reasoning: self.reasoning(ctx),
            generated_by: if opinion.is_fallback {
                GeneratedBy::RuleBased
            } else {
                GeneratedBy::AiHybrid
            },
            generated_at: now,
            expires_at: Recommendation::expiry_for(now),
            applied: false,
            applied_at: None,
        }
    }

    /// A CRITICAL vulnerability overrides whatever the advisory model said
    pub fn risk_level(
        &self,
        vulnerabilities: &[VulnerabilityRecord],
        opinion: &AdvisoryOpinion,
    ) -> RiskLevel {
        if vulnerabilities
            .iter()
            .any(|v| v.severity == Severity::Critical)
        {
            RiskLevel::Critical
        } else {
            opinion.risk_level
        }
    }

    /// Starts at 70 and gains 10 for each corroborating source, capped at 100
    pub fn confidence_score(
        &self,
        vulnerabilities: &[VulnerabilityRecord],
        signal: &RepositorySignal,
        opinion: &AdvisoryOpinion,
    ) -> f64 {
        let mut confidence = 70.0;
        if !vulnerabilities.is_empty() {
            confidence += 10.0;
        }
        if signal.dependent_repositories() > 0 {
            confidence += 10.0;
        }
        if opinion.analysis.chars().count() > 100 {
            confidence += 10.0;
        }
        f64::min(confidence, 100.0)
    }

    pub fn has_breaking_changes(&self, signal: &RepositorySignal, opinion: &AdvisoryOpinion) -> bool {
        signal.rollback_commits() > 0 || opinion.mentions_breaking_changes()
    }

    /// Rough migration effort: 4h per vulnerability, 8h per rollback seen upstream
    pub fn estimated_hours(
        &self,
        vulnerabilities: &[VulnerabilityRecord],
        signal: &RepositorySignal,
    ) -> u32 {
        let vulnerability_hours = u32::try_from(vulnerabilities.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(4);
        vulnerability_hours.saturating_add(signal.rollback_commits().saturating_mul(8))
    }

    fn reasoning(&self, ctx: &RecommendationContext<'_>) -> String {
        format!(
            "{}\n\n{}\n\nSignals: security score {:.1}, stability score {:.1}, {} known vulnerabilities",
            ctx.opinion.analysis,
            ctx.opinion.recommendation,
            ctx.security_score,
            ctx.stability_score,
            ctx.vulnerabilities.len()
        )
    }
}

impl Default for RecommendationSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vuln(severity: Severity) -> VulnerabilityRecord {
        VulnerabilityRecord::new(format!("CVE-{}", severity), severity)
    }

    fn opinion(analysis: &str, recommendation: &str) -> AdvisoryOpinion {
        AdvisoryOpinion::from_model_output(analysis.to_string(), recommendation.to_string(), None)
    }

    fn context<'a>(
        signal: &'a RepositorySignal,
        vulnerabilities: &'a [VulnerabilityRecord],
        opinion: &'a AdvisoryOpinion,
    ) -> RecommendationContext<'a> {
        let calculator = ScoreCalculator::new();
        RecommendationContext {
            package_manager: Ecosystem::Npm,
            dependency: "express",
            current_version: "4.17.1",
            target_version: "4.18.2",
            security_score: calculator.security_score(vulnerabilities),
            stability_score: calculator.stability_score(signal),
            signal,
            vulnerabilities,
            opinion,
        }
    }

    #[test]
    fn test_security_score_penalties() {
        let calculator = ScoreCalculator::new();
        assert_eq!(calculator.security_score(&[]), 100.0);
        assert_eq!(calculator.security_score(&[vuln(Severity::Critical)]), 75.0);
        assert_eq!(
            calculator.security_score(&[vuln(Severity::High), vuln(Severity::Low)]),
            82.0
        );
        let many: Vec<_> = (0..10).map(|_| vuln(Severity::Critical)).collect();
        assert_eq!(calculator.security_score(&many), 0.0);
    }

    #[test]
    fn test_stability_score() {
        let calculator = ScoreCalculator::new();
        assert_eq!(calculator.stability_score(&RepositorySignal::empty()), 80.0);

        let signal = RepositorySignal {
            rollback_commits: Some(3),
            has_hotfix: Some(true),
            ..Default::default()
        };
        assert_eq!(calculator.stability_score(&signal), 55.0);

        let signal = RepositorySignal {
            rollback_commits: Some(40),
            ..Default::default()
        };
        assert_eq!(calculator.stability_score(&signal), 0.0);
    }

    #[test]
    fn test_stability_only_drops_with_more_rollbacks() {
        let calculator = ScoreCalculator::new();
        let mut previous = f64::MAX;
        for rollbacks in 0..25 {
            let signal = RepositorySignal {
                rollback_commits: Some(rollbacks),
                ..Default::default()
            };
            let score = calculator.stability_score(&signal);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_healthy_repository_scores() {
        let calculator = ScoreCalculator::new();
        let signal = RepositorySignal {
            stars: Some(2000),
            forks: Some(200),
            open_issues: Some(10),
            rollback_commits: Some(0),
            has_hotfix: Some(false),
            ..Default::default()
        };

        assert_eq!(calculator.stability_score(&signal), 80.0);
        assert_eq!(calculator.community_health_score(&signal), 100.0);
        assert_eq!(calculator.maintenance_score(&signal), 75.0);
        assert_eq!(calculator.security_score(&[]), 100.0);
    }

    #[test]
    fn test_step_scores() {
        let calculator = ScoreCalculator::new();
        let signal = |stars, open_issues, dependents| RepositorySignal {
            stars: Some(stars),
            open_issues: Some(open_issues),
            dependent_repositories: Some(dependents),
            ..Default::default()
        };

        assert_eq!(calculator.community_health_score(&signal(150, 0, 0)), 80.0);
        assert_eq!(calculator.community_health_score(&signal(100, 0, 0)), 70.0);
        assert_eq!(calculator.maintenance_score(&signal(0, 51, 0)), 65.0);
        assert_eq!(calculator.maintenance_score(&signal(0, 101, 0)), 55.0);
        assert_eq!(calculator.adoption_score(&signal(0, 0, 1001)), 95.0);
        assert_eq!(calculator.adoption_score(&signal(0, 0, 101)), 80.0);
        assert_eq!(calculator.adoption_score(&signal(0, 0, 11)), 65.0);
        assert_eq!(calculator.adoption_score(&signal(0, 0, 10)), 50.0);
    }

    #[test]
    fn test_security_score_orders_by_severity() {
        let calculator = ScoreCalculator::new();
        assert!(
            calculator.security_score(&[vuln(Severity::Critical)])
                < calculator.security_score(&[vuln(Severity::Low)])
        );
    }

    #[test]
    fn test_overall_score_is_monotonic() {
        let calculator = ScoreCalculator::new();
        let steps = [0.0, 10.0, 39.9, 40.0, 75.0, 100.0];
        for fixed in steps {
            for pair in steps.windows(2) {
                let (low, high) = (pair[0], pair[1]);
                assert!(calculator.overall_score(low, fixed, fixed) <= calculator.overall_score(high, fixed, fixed));
                assert!(calculator.overall_score(fixed, low, fixed) <= calculator.overall_score(fixed, high, fixed));
                assert!(calculator.overall_score(fixed, fixed, low) <= calculator.overall_score(fixed, fixed, high));
            }
        }
    }

    #[test]
    fn test_overall_score_is_bounded() {
        let calculator = ScoreCalculator::new();
        assert_eq!(calculator.overall_score(100.0, 100.0, 100.0), 100.0);
        assert_eq!(calculator.overall_score(0.0, 0.0, 0.0), 0.0);
        assert_eq!(calculator.overall_score(500.0, -20.0, f64::NAN), 40.0);
    }

    #[test]
    fn test_overall_score_weights() {
        // 0.4 * 50 + 0.4 * 80 + 0.2 * 85
        let score = ScoreCalculator::new().overall_score(50.0, 80.0, PERFORMANCE_PLACEHOLDER);
        assert!((score - 69.0).abs() < 1e-9);
    }

    #[test]
    fn test_sub_scores_stay_in_range() {
        let calculator = ScoreCalculator::new();
        let signal = RepositorySignal {
            stars: Some(u64::MAX),
            forks: Some(u64::MAX),
            open_issues: Some(u64::MAX),
            dependent_repositories: Some(u64::MAX),
            ..Default::default()
        };
        for score in [
            calculator.community_health_score(&signal),
            calculator.maintenance_score(&signal),
            calculator.adoption_score(&signal),
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }

    #[test]
    fn test_risk_classifier_boundaries() {
        let classifier = RiskClassifier::new();
        assert_eq!(classifier.classify(100.0), RiskLevel::Low);
        assert_eq!(classifier.classify(80.0), RiskLevel::Low);
        assert_eq!(classifier.classify(79.99), RiskLevel::Medium);
        assert_eq!(classifier.classify(60.0), RiskLevel::Medium);
        assert_eq!(classifier.classify(40.0), RiskLevel::High);
        assert_eq!(classifier.classify(39.9), RiskLevel::Critical);
        assert_eq!(classifier.classify(0.0), RiskLevel::Critical);
    }

    #[test]
    fn test_keyword_precedence() {
        assert_eq!(
            RISK_LEVEL_RULES.classify("Mostly LOW but one HIGH finding"),
            RiskLevel::High
        );
        assert_eq!(RISK_LEVEL_RULES.classify("no verdict"), RiskLevel::Unknown);
        assert_eq!(
            ACTION_RULES.classify("Do not DOWNGRADE, UPGRADE instead"),
            RecommendationType::Upgrade
        );
        assert_eq!(
            ACTION_RULES.classify("Consider an ALTERNATIVE"),
            RecommendationType::Alternative
        );
        assert_eq!(ACTION_RULES.classify(""), RecommendationType::Hold);
    }

    #[test]
    fn test_extract_alternative_version() {
        assert_eq!(
            extract_alternative_version("Alternative version: 2.3.1").as_deref(),
            Some("2.3.1")
        );
        assert_eq!(
            extract_alternative_version("ALTERNATIVE v3.0.0-beta.1 is safer").as_deref(),
            Some("3.0.0-beta.1")
        );
        assert_eq!(extract_alternative_version("UPGRADE to 4.18.2"), None);
    }

    #[test]
    fn test_critical_vulnerability_overrides_opinion() {
        let signal = RepositorySignal::empty();
        let vulns = vec![vuln(Severity::Critical)];
        let opinion = opinion("Risk: LOW", "UPGRADE");
        let now = Utc::now();

        let recommendation =
            RecommendationSynthesizer::new().synthesize(&context(&signal, &vulns, &opinion), now);

        assert_eq!(recommendation.risk_level, RiskLevel::Critical);
        assert!(recommendation.has_security_fixes);
    }

    #[test]
    fn test_clean_dependency_recommendation() {
        let signal = RepositorySignal::empty();
        let opinion = opinion("Risk: LOW", "UPGRADE");
        let now = Utc::now();

        let recommendation =
            RecommendationSynthesizer::new().synthesize(&context(&signal, &[], &opinion), now);

        assert_eq!(recommendation.risk_level, RiskLevel::Low);
        assert_eq!(recommendation.recommendation_type, RecommendationType::Upgrade);
        assert!(!recommendation.has_breaking_changes);
        assert!(!recommendation.has_security_fixes);
        assert_eq!(recommendation.estimated_savings_hours, 0);
        assert_eq!(recommendation.confidence_score, 70.0);
        assert_eq!(recommendation.generated_by, GeneratedBy::AiHybrid);
        assert_eq!(recommendation.recommended_version, "4.18.2");
        assert!(!recommendation.is_applied());
    }

    #[test]
    fn test_breaking_changes_and_effort() {
        let signal = RepositorySignal {
            rollback_commits: Some(2),
            dependent_repositories: Some(12),
            ..Default::default()
        };
        let vulns = vec![vuln(Severity::High), vuln(Severity::Medium)];
        let analysis = "Risk level MEDIUM. ".repeat(10);
        let opinion = opinion(&analysis, "HOLD until the bugfix release");

        let recommendation = RecommendationSynthesizer::new()
            .synthesize(&context(&signal, &vulns, &opinion), Utc::now());

        assert!(recommendation.has_breaking_changes);
        assert!(recommendation.has_bug_fixes);
        assert_eq!(recommendation.estimated_savings_hours, 2 * 4 + 2 * 8);
        assert_eq!(recommendation.confidence_score, 100.0);
        assert_eq!(recommendation.recommendation_type, RecommendationType::Hold);
    }

    #[test]
    fn test_critical_vulnerability_with_rollbacks() {
        let signal = RepositorySignal {
            rollback_commits: Some(2),
            ..Default::default()
        };
        let vulns = vec![vuln(Severity::Critical)];
        let opinion = opinion("Risk level: LOW", "UPGRADE");

        let recommendation = RecommendationSynthesizer::new()
            .synthesize(&context(&signal, &vulns, &opinion), Utc::now());

        assert_eq!(recommendation.risk_level, RiskLevel::Critical);
        assert!(recommendation.has_breaking_changes);
        assert_eq!(recommendation.estimated_savings_hours, 20);
    }

    #[test]
    fn test_breaking_keyword_alone_marks_breaking_changes() {
        let signal = RepositorySignal::empty();
        let opinion = opinion("This release has Breaking API changes", "HOLD");
        assert!(RecommendationSynthesizer::new().has_breaking_changes(&signal, &opinion));
    }

    #[test]
    fn test_fallback_opinion_is_rule_based() {
        let signal = RepositorySignal::empty();
        let opinion = AdvisoryOpinion::fallback();
        let now = Utc::now();

        let recommendation =
            RecommendationSynthesizer::new().synthesize(&context(&signal, &[], &opinion), now);

        assert_eq!(recommendation.risk_level, RiskLevel::Unknown);
        assert_eq!(recommendation.recommendation_type, RecommendationType::Hold);
        assert_eq!(recommendation.generated_by, GeneratedBy::RuleBased);
        assert!(recommendation.reasoning.contains("security score 100.0"));
    }

    #[test]
    fn test_recommendation_expiry() {
        let signal = RepositorySignal::empty();
        let opinion = opinion("LOW", "UPGRADE");
        let now = Utc::now();

        let recommendation =
            RecommendationSynthesizer::new().synthesize(&context(&signal, &[], &opinion), now);

        assert_eq!(recommendation.expires_at, now + Duration::days(7));
        assert!(!recommendation.is_expired(now + Duration::days(6)));
        assert!(recommendation.is_expired(now + Duration::days(7)));
    }
}

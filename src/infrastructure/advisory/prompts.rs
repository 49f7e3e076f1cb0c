//! Prompt templates for the advisory model

pub const RISK_ANALYSIS_PROMPT: &str = r#"You are a senior software dependency security analyst. Assess the risk of adopting {dependency} version {version}.

## Collected signals
{context}

Cover the security risk level (CRITICAL, HIGH, MEDIUM or LOW), stability, the likelihood of breaking changes,
community adoption and the action you would take (UPGRADE, HOLD, DOWNGRADE or ALTERNATIVE).

Answer with a JSON object:
{
    "risk_level": "...",
    "breaking_changes_risk": "LOW | MEDIUM | HIGH",
    "recommended_action": "...",
    "reasoning": "...",
    "confidence": 0-100
}
"#;

pub const RECOMMENDATION_PROMPT: &str = r#"You are a dependency management expert. Recommend how to move {dependency} from version {current_version} towards {target_version}.

## Risk factors
{risk_factors}

Weigh security fixes, bug fixes, breaking changes, performance and community adoption.

Answer in exactly this format:
Recommended version: <version>
Alternative version: <version or none>
Action: UPGRADE, HOLD, DOWNGRADE or ALTERNATIVE
Expected benefits: <text>
Potential risks: <text>
"#;

pub const ECOSYSTEM_ASSESSMENT_PROMPT: &str = r#"Assess the ecosystem health of the dependency {dependency}.

## Repository signals
{repository}

## Vulnerabilities
{vulnerabilities}

Answer with a JSON object containing:
overall_health_score (0-100), maintenance_activity (ACTIVE, MODERATE, LOW, STALE),
community_engagement (HIGH, MEDIUM, LOW), security_posture (STRONG, MODERATE, WEAK),
risk_trend (IMPROVING, STABLE, WORSENING), key_risks (array of strings),
recommendations (array of strings).
"#;

pub fn risk_analysis_prompt(dependency: &str, version: &str, context: &str) -> String {
    RISK_ANALYSIS_PROMPT
        .replace("{dependency}", dependency)
        .replace("{version}", version)
        .replace("{context}", context)
}

pub fn recommendation_prompt(
    dependency: &str,
    current_version: &str,
    target_version: &str,
    risk_factors: &str,
) -> String {
    RECOMMENDATION_PROMPT
        .replace("{dependency}", dependency)
        .replace("{current_version}", current_version)
        .replace("{target_version}", target_version)
        .replace("{risk_factors}", risk_factors)
}

pub fn ecosystem_assessment_prompt(dependency: &str, repository: &str, vulnerabilities: &str) -> String {
    ECOSYSTEM_ASSESSMENT_PROMPT
        .replace("{dependency}", dependency)
        .replace("{repository}", repository)
        .replace("{vulnerabilities}", vulnerabilities)
}

//! OSV API client implementation

use super::traits::VulnerabilitySource;
use crate::application::errors::{ApiError, CollectionError};
use crate::domain::{DependencyKey, Ecosystem, Severity, VulnerabilityRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Request payload for OSV query endpoint
#[derive(Debug, Serialize)]
struct OsvQueryRequest {
    package: OsvPackage,
    version: String,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

/// Response from OSV query endpoint. OSV omits `vulns` entirely when nothing matches.
#[derive(Debug, Deserialize)]
struct OsvQueryResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    summary: Option<String>,
    details: Option<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
    database_specific: Option<OsvDatabaseSpecific>,
}

#[derive(Debug, Deserialize)]
struct OsvSeverity {
    score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvDatabaseSpecific {
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Debug, Deserialize)]
struct OsvEvent {
    introduced: Option<String>,
    fixed: Option<String>,
}

/// Client for the OSV (Open Source Vulnerability) API
pub struct OsvClient {
    client: Client,
    base_url: String,
}

impl OsvClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.osv.dev";

    pub fn new(base_url: String, timeout: Duration) -> Result<Self, CollectionError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dependency-advisor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert domain ecosystem to OSV ecosystem string
    fn ecosystem_to_osv_string(ecosystem: Ecosystem) -> &'static str {
        match ecosystem {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Maven => "Maven",
            Ecosystem::Cargo => "crates.io",
            Ecosystem::Go => "Go",
            Ecosystem::Packagist => "Packagist",
            Ecosystem::RubyGems => "RubyGems",
            Ecosystem::NuGet => "NuGet",
        }
    }

    /// Render the first affected range as `>=introduced, <fixed`
    fn affected_range(affected: &[OsvAffected]) -> Option<String> {
        let events = &affected.iter().flat_map(|a| &a.ranges).next()?.events;
        let introduced = events.iter().find_map(|e| e.introduced.as_deref());
        let fixed = events.iter().find_map(|e| e.fixed.as_deref());

        match (introduced, fixed) {
            (Some(introduced), Some(fixed)) => Some(format!(">={}, <{}", introduced, fixed)),
            (Some(introduced), None) => Some(format!(">={}", introduced)),
            (None, Some(fixed)) => Some(format!("<{}", fixed)),
            (None, None) => None,
        }
    }

    fn convert_osv_vulnerability(osv_vuln: OsvVulnerability) -> VulnerabilityRecord {
        // Vector strings like "CVSS:3.1/AV:N/..." carry no base score, only plain numbers count
        let cvss_score = osv_vuln
            .severity
            .iter()
            .filter_map(|s| s.score.as_deref())
            .find_map(|score| score.trim().parse::<f64>().ok())
            .map(|score| score.clamp(0.0, 10.0));

        let severity = osv_vuln
            .database_specific
            .as_ref()
            .and_then(|d| d.severity.as_deref())
            .and_then(|s| Severity::from_str(s).ok())
            .or_else(|| cvss_score.map(Severity::from_cvss))
            .unwrap_or_default();

        VulnerabilityRecord {
            affected_range: Self::affected_range(&osv_vuln.affected),
            id: osv_vuln.id,
            summary: osv_vuln.summary.or(osv_vuln.details).unwrap_or_default(),
            severity,
            cvss_score,
        }
    }
}

#[async_trait]
impl VulnerabilitySource for OsvClient {
    async fn fetch_vulnerabilities(
        &self,
        dependency: &DependencyKey,
    ) -> Result<Vec<VulnerabilityRecord>, CollectionError> {
        let request_payload = OsvQueryRequest {
            package: OsvPackage {
                name: dependency.name.clone(),
                ecosystem: Self::ecosystem_to_osv_string(dependency.ecosystem).to_string(),
            },
            version: dependency.version.clone(),
        };

        let url = format!("{}/v1/query", self.base_url);
        let response = self.client.post(&url).json(&request_payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 429 {
                return Err(CollectionError::RateLimit {
                    api: "OSV".to_string(),
                });
            }
            let error_text = response.text().await.unwrap_or_default();
            return Err(CollectionError::Api(ApiError::from_status(
                status,
                format!("OSV API error: {}", error_text),
            )));
        }

        let osv_response: OsvQueryResponse = response.json().await?;
        tracing::debug!(
            "OSV returned {} vulnerabilities for {}",
            osv_response.vulns.len(),
            dependency
        );

        Ok(osv_response
            .vulns
            .into_iter()
            .map(Self::convert_osv_vulnerability)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> VulnerabilityRecord {
        OsvClient::convert_osv_vulnerability(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_severity_from_database_specific() {
        let record = parse(json!({
            "id": "GHSA-xxxx",
            "summary": "Prototype pollution",
            "severity": [{"type": "CVSS_V3", "score": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"}],
            "database_specific": {"severity": "MODERATE"}
        }));

        assert_eq!(record.severity, Severity::Medium);
        assert_eq!(record.cvss_score, None);
        assert_eq!(record.summary, "Prototype pollution");
    }

    #[test]
    fn test_severity_derived_from_numeric_cvss() {
        let record = parse(json!({
            "id": "OSV-2022-123",
            "details": "Only details available",
            "severity": [{"type": "CVSS_V3", "score": "9.8"}]
        }));

        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.cvss_score, Some(9.8));
        assert_eq!(record.summary, "Only details available");
    }

    #[test]
    fn test_missing_severity_is_none() {
        let record = parse(json!({"id": "OSV-1"}));
        assert_eq!(record.severity, Severity::None);
        assert_eq!(record.affected_range, None);
    }

    #[test]
    fn test_affected_range_rendering() {
        let record = parse(json!({
            "id": "OSV-2",
            "affected": [{
                "ranges": [{
                    "type": "SEMVER",
                    "events": [{"introduced": "0"}, {"fixed": "4.17.21"}]
                }]
            }]
        }));
        assert_eq!(record.affected_range.as_deref(), Some(">=0, <4.17.21"));

        let record = parse(json!({
            "id": "OSV-3",
            "affected": [{"ranges": [{"events": [{"introduced": "1.0.0"}]}]}]
        }));
        assert_eq!(record.affected_range.as_deref(), Some(">=1.0.0"));
    }

    #[test]
    fn test_ecosystem_conversion() {
        assert_eq!(OsvClient::ecosystem_to_osv_string(Ecosystem::Npm), "npm");
        assert_eq!(OsvClient::ecosystem_to_osv_string(Ecosystem::PyPI), "PyPI");
        assert_eq!(OsvClient::ecosystem_to_osv_string(Ecosystem::Cargo), "crates.io");
        assert_eq!(OsvClient::ecosystem_to_osv_string(Ecosystem::NuGet), "NuGet");
    }

    #[test]
    fn test_request_payload_serialization() {
        let request = OsvQueryRequest {
            package: OsvPackage {
                name: "express".to_string(),
                ecosystem: "npm".to_string(),
            },
            version: "4.17.1".to_string(),
        };

        let parsed = serde_json::to_value(&request).unwrap();
        assert_eq!(parsed["package"]["name"], "express");
        assert_eq!(parsed["package"]["ecosystem"], "npm");
        assert_eq!(parsed["version"], "4.17.1");
    }
}

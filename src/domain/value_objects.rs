//! Domain value objects representing immutable concepts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;

/// Vulnerability severity as reported by a vulnerability source
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Derive a severity from a CVSS base score (0.0 - 10.0)
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "NONE"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" | "moderate" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Categorical risk of adopting a dependency version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action suggested for a dependency upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationType {
    Upgrade,
    #[default]
    Hold,
    Downgrade,
    Alternative,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationType::Upgrade => write!(f, "UPGRADE"),
            RecommendationType::Hold => write!(f, "HOLD"),
            RecommendationType::Downgrade => write!(f, "DOWNGRADE"),
            RecommendationType::Alternative => write!(f, "ALTERNATIVE"),
        }
    }
}

/// How a recommendation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeneratedBy {
    /// Scores combined with a real advisory model opinion
    AiHybrid,
    /// Scores only; the advisory model fell back
    RuleBased,
}

impl fmt::Display for GeneratedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedBy::AiHybrid => write!(f, "AI_HYBRID"),
            GeneratedBy::RuleBased => write!(f, "RULE_BASED"),
        }
    }
}

/// Package ecosystems (package managers) a dependency can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    Npm,
    PyPI,
    Maven,
    Cargo,
    Go,
    Packagist,
    RubyGems,
    NuGet,
}

impl Ecosystem {
    /// Get all supported ecosystems
    pub fn all() -> Vec<Ecosystem> {
        vec![
            Ecosystem::Npm,
            Ecosystem::PyPI,
            Ecosystem::Maven,
            Ecosystem::Cargo,
            Ecosystem::Go,
            Ecosystem::Packagist,
            Ecosystem::RubyGems,
            Ecosystem::NuGet,
        ]
    }

    /// Get the canonical name for this ecosystem
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "pypi",
            Ecosystem::Maven => "maven",
            Ecosystem::Cargo => "cargo",
            Ecosystem::Go => "go",
            Ecosystem::Packagist => "packagist",
            Ecosystem::RubyGems => "rubygems",
            Ecosystem::NuGet => "nuget",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "npm" | "yarn" => Ok(Ecosystem::Npm),
            "pypi" | "pip" | "python" => Ok(Ecosystem::PyPI),
            "maven" | "gradle" | "java" => Ok(Ecosystem::Maven),
            "cargo" | "rust" => Ok(Ecosystem::Cargo),
            "go" | "golang" => Ok(Ecosystem::Go),
            "packagist" | "composer" | "php" => Ok(Ecosystem::Packagist),
            "rubygems" | "ruby" => Ok(Ecosystem::RubyGems),
            "nuget" | "dotnet" | ".net" => Ok(Ecosystem::NuGet),
            _ => Err(format!("Unknown ecosystem: {}", s)),
        }
    }
}

/// A dependency at a specific version, addressed as `packageManager:name:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyKey {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
}

impl DependencyKey {
    /// Create a key from already separated parts
    pub fn new(ecosystem: Ecosystem, name: &str, version: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        let version = version.trim();

        if name.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "dependency".to_string(),
                message: "Dependency name cannot be empty".to_string(),
            });
        }
        if version.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "version".to_string(),
                message: "Version cannot be empty".to_string(),
            });
        }

        Ok(Self {
            ecosystem,
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Parse a `packageManager:name:version` key.
    ///
    /// The first segment is the package manager and the last one the version;
    /// everything in between is the name, so `maven:org.slf4j:slf4j-api:2.0.9`
    /// keeps `org.slf4j:slf4j-api` intact.
    pub fn parse(key: &str) -> Result<Self, DomainError> {
        let malformed = |reason: &str| DomainError::InvalidDependencyKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = key.trim().split(':').collect();
        if parts.len() < 3 {
            return Err(malformed("expected packageManager:name:version"));
        }
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(malformed("empty segment"));
        }

        let ecosystem = Ecosystem::from_str(parts[0]).map_err(|e| malformed(&e))?;
        let name = parts[1..parts.len() - 1].join(":");
        let version = parts[parts.len() - 1];

        Self::new(ecosystem, &name, version).map_err(|e| malformed(&e.to_string()))
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.ecosystem.canonical_name(),
            self.name,
            self.version
        )
    }
}

impl FromStr for DependencyKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

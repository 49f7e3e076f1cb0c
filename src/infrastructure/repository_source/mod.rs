//! Repository Signal Source Abstractions
//!
//! Provides a trait for the code-hosting lookups behind a `RepositorySignal`:
//! finding repositories that use a dependency, reading their stats and scanning
//! recent commit messages. The GitHub implementation lives alongside this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod github_client;
pub use github_client::{GitHubRepositoryClient, is_hotfix_message, is_rollback_message};

use crate::application::errors::CollectionError;

/// Result of searching for repositories that use a dependency
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependentSearch {
    /// Total number of matches reported by the provider
    pub total_count: u64,
    /// Full names (`owner/name`) in the provider's ordering, at most `limit` of them
    pub repositories: Vec<String>,
}

/// Stats of a single repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub full_name: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub language: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RepositorySignalSource: Send + Sync {
    async fn search_dependents(
        &self,
        dependency: &str,
        limit: u32,
    ) -> Result<DependentSearch, CollectionError>;

    async fn fetch_repository(&self, repository: &str) -> Result<RepositoryStats, CollectionError>;

    /// Number of recent commits whose message indicates a rollback
    async fn rollback_count(
        &self,
        repository: &str,
        version: Option<&str>,
    ) -> Result<u32, CollectionError>;

    /// Whether a recent commit looks like a hotfix for `version` (any version when `None`)
    async fn has_hotfix(
        &self,
        repository: &str,
        version: Option<&str>,
    ) -> Result<bool, CollectionError>;
}

//! GitHub repository signal source implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{DependentSearch, RepositorySignalSource, RepositoryStats};
use crate::application::errors::{ApiError, CollectionError};

const ROLLBACK_KEYWORDS: &[&str] = &[
    "revert",
    "rollback",
    "roll back",
    "downgrade",
    "back out",
    "back-out",
];

const HOTFIX_KEYWORDS: &[&str] = &["hotfix", "patch"];

/// Whether a commit message indicates that an earlier change was undone
pub fn is_rollback_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ROLLBACK_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Whether a commit message looks like a hotfix for `version`
pub fn is_hotfix_message(message: &str, version: Option<&str>) -> bool {
    let lower = message.to_lowercase();
    if !HOTFIX_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    match version {
        Some(version) => lower.contains(&version.to_lowercase()),
        None => true,
    }
}

/// GitHub client reading search results, repository stats and commit history
pub struct GitHubRepositoryClient {
    octo: Octocrab,
    commit_sample_size: u32,
}

impl GitHubRepositoryClient {
    pub fn new(octo: Octocrab, commit_sample_size: u32) -> Self {
        Self {
            octo,
            // GitHub pages are capped at 100 entries
            commit_sample_size: commit_sample_size.clamp(1, 100),
        }
    }

    pub fn from_token(
        token: Option<String>,
        base_url: Option<String>,
        commit_sample_size: u32,
    ) -> Result<Self, CollectionError> {
        let mut builder = Octocrab::builder();
        if let Some(url) = &base_url {
            builder = builder.base_uri(url.as_str())?;
        }
        if let Some(t) = token {
            if !t.trim().is_empty() {
                builder = builder.personal_token(t);
            }
        }
        Ok(Self::new(builder.build()?, commit_sample_size))
    }

    async fn recent_commit_messages(&self, repository: &str) -> Result<Vec<String>, CollectionError> {
        let route = format!("/repos/{}/commits", repository);
        let per_page = self.commit_sample_size.to_string();
        let commits: Value = self
            .octo
            .get(route, Some(&[("per_page", per_page.as_str())]))
            .await
            .map_err(classify_octocrab_error)?;

        Ok(commits
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|c| c.pointer("/commit/message").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl RepositorySignalSource for GitHubRepositoryClient {
    #[instrument(skip(self))]
    async fn search_dependents(
        &self,
        dependency: &str,
        limit: u32,
    ) -> Result<DependentSearch, CollectionError> {
        let query = format!(
            "{} in:file extension:json extension:xml extension:gradle extension:py",
            dependency
        );
        let per_page = limit.clamp(1, 100).to_string();
        let resp: Value = self
            .octo
            .get(
                "/search/repositories",
                Some(&[("q", query.as_str()), ("per_page", per_page.as_str())]),
            )
            .await
            .map_err(classify_octocrab_error)?;

        let repositories: Vec<String> = resp
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("full_name").and_then(Value::as_str))
                    .take(limit as usize)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let total_count = resp
            .get("total_count")
            .and_then(Value::as_u64)
            .unwrap_or(repositories.len() as u64);

        debug!(total_count, sampled = repositories.len(), "dependent search complete");
        Ok(DependentSearch {
            total_count,
            repositories,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_repository(&self, repository: &str) -> Result<RepositoryStats, CollectionError> {
        let repo: Value = self
            .octo
            .get(format!("/repos/{}", repository), None::<&()>)
            .await
            .map_err(classify_octocrab_error)?;

        let count = |field: &str| repo.get(field).and_then(Value::as_u64).unwrap_or(0);

        Ok(RepositoryStats {
            full_name: repo
                .get("full_name")
                .and_then(Value::as_str)
                .unwrap_or(repository)
                .to_string(),
            stars: count("stargazers_count"),
            forks: count("forks_count"),
            open_issues: count("open_issues_count"),
            language: repo
                .get("language")
                .and_then(Value::as_str)
                .map(str::to_string),
            pushed_at: repo
                .get("pushed_at")
                .and_then(Value::as_str)
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    #[instrument(skip(self))]
    async fn rollback_count(
        &self,
        repository: &str,
        _version: Option<&str>,
    ) -> Result<u32, CollectionError> {
        let messages = self.recent_commit_messages(repository).await?;
        let count = messages.iter().filter(|m| is_rollback_message(m)).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self))]
    async fn has_hotfix(
        &self,
        repository: &str,
        version: Option<&str>,
    ) -> Result<bool, CollectionError> {
        let messages = self.recent_commit_messages(repository).await?;
        Ok(messages.iter().any(|m| is_hotfix_message(m, version)))
    }
}

fn classify_octocrab_error(e: octocrab::Error) -> CollectionError {
    // octocrab folds the HTTP status into its message, classify on that
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("rate limit exceeded") {
        return CollectionError::RateLimit {
            api: "GitHub".to_string(),
        };
    }
    if lower.contains("not found") || lower.contains("404") {
        return CollectionError::Api(ApiError::Http {
            status: 404,
            message: msg,
        });
    }
    if lower.contains("bad credentials")
        || lower.contains("requires authentication")
        || lower.contains("401")
    {
        return CollectionError::Api(ApiError::Authentication);
    }
    CollectionError::GitHub(e)
}

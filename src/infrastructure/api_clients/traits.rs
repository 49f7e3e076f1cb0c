//! Traits for vulnerability API clients

use crate::application::errors::CollectionError;
use crate::domain::{DependencyKey, VulnerabilityRecord};
use async_trait::async_trait;

/// Source of known vulnerabilities for a package version
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    async fn fetch_vulnerabilities(
        &self,
        dependency: &DependencyKey,
    ) -> Result<Vec<VulnerabilityRecord>, CollectionError>;
}

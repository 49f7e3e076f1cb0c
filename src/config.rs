//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::{CircuitBreakerConfig, RetryConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub apis: ApiConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether to expose interactive API docs (Swagger UI). Should be false in hardened production.
    pub enable_docs: bool,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins. Use ["*"] to allow any (development only). Empty vector -> no external origins.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_docs: true,
            request_timeout_seconds: 120,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// External API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub github: GitHubConfig,
    pub osv: OsvConfig,
    pub advisory: AdvisoryConfig,
}

/// GitHub configuration for repository signals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Override for GitHub Enterprise; the public API is used when unset
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Number of repositories sampled from the dependent search
    pub search_limit: u32,
    /// Number of recent commits scanned for rollbacks and hotfixes
    pub commit_sample_size: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_seconds: 30,
            search_limit: 10,
            commit_sample_size: 100,
        }
    }
}

/// OSV API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsvConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for OsvConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.osv.dev".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Advisory model (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            api_url: crate::infrastructure::advisory::gemini::DEFAULT_GEMINI_API_URL.to_string(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

/// Analysis orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on dependencies analyzed at once in batch and project analyses
    pub max_concurrent_analyses: usize,
    /// Deadline for a whole batch; results gathered so far are returned when it fires
    pub batch_timeout_seconds: u64,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            batch_timeout_seconds: 300,
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_seconds: 60,
        }
    }
}

impl CircuitBreakerSettings {
    /// Breaker configuration whose per-request timeout is the source's own timeout
    pub fn to_breaker_config(&self, request_timeout_seconds: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(self.recovery_timeout_seconds),
            half_open_max_requests: 1,
            request_timeout: Duration::from_secs(request_timeout_seconds.max(1)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json`, `pretty` or anything else for the compact default
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // Environment-specific file, if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder
            .add_source(config::Environment::with_prefix("ADVISOR").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.apis.github.search_limit, 10);
        assert_eq!(config.apis.github.commit_sample_size, 100);
        assert_eq!(config.apis.osv.base_url, "https://api.osv.dev");
        assert!(config.apis.advisory.api_key.is_none());
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("analysis.max_concurrent_analyses", 8)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.analysis.max_concurrent_analyses, 8);
        assert_eq!(config.analysis.retry.max_attempts, 3);
    }

    #[test]
    fn test_breaker_config_uses_source_timeout() {
        let breaker = CircuitBreakerSettings::default().to_breaker_config(15);
        assert_eq!(breaker.request_timeout, Duration::from_secs(15));
        assert_eq!(breaker.failure_threshold, 5);
    }
}

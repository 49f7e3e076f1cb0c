//! Resilience patterns for external API calls

use crate::application::errors::{AdvisoryError, ApiError, CollectionError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Errors that the circuit breaker and retry helpers know how to produce and classify
pub trait ResilientError: std::error::Error + Send + Sync + 'static {
    /// Error returned when an operation exceeded its time limit
    fn timed_out(seconds: u64) -> Self;

    /// Error returned when the circuit rejects a request without trying it
    fn circuit_open() -> Self;

    /// Whether another attempt has a chance to succeed
    fn is_retryable(&self) -> bool;
}

fn is_retryable_api_error(error: &ApiError) -> bool {
    match error {
        // Retry on server errors and rate limiting
        ApiError::Http { status, .. } => *status >= 500 || *status == 429,
        ApiError::ServiceUnavailable => true,
        ApiError::Authentication | ApiError::CircuitOpen => false,
    }
}

impl ResilientError for CollectionError {
    fn timed_out(seconds: u64) -> Self {
        CollectionError::Timeout { seconds }
    }

    fn circuit_open() -> Self {
        CollectionError::Api(ApiError::CircuitOpen)
    }

    fn is_retryable(&self) -> bool {
        match self {
            CollectionError::Network(_) => true,
            CollectionError::Timeout { .. } => true,
            CollectionError::RateLimit { .. } => true,
            CollectionError::Api(api_error) => is_retryable_api_error(api_error),
            _ => false,
        }
    }
}

impl ResilientError for AdvisoryError {
    fn timed_out(seconds: u64) -> Self {
        AdvisoryError::Timeout { seconds }
    }

    fn circuit_open() -> Self {
        AdvisoryError::Api(ApiError::CircuitOpen)
    }

    fn is_retryable(&self) -> bool {
        match self {
            AdvisoryError::Network(_) => true,
            AdvisoryError::Api(api_error) => is_retryable_api_error(api_error),
            // The advisory call already sits behind its own deadline
            AdvisoryError::Timeout { .. } => false,
            AdvisoryError::MissingApiKey | AdvisoryError::EmptyResponse => false,
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed through
    Closed,
    /// Circuit is open, requests are rejected immediately
    Open,
    /// Circuit is half-open, allowing limited requests to test if service has recovered
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Duration to wait before transitioning from Open to HalfOpen
    pub recovery_timeout: Duration,
    /// Maximum number of requests allowed in HalfOpen state
    pub half_open_max_requests: u32,
    /// Timeout for individual requests
    pub request_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_requests: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Circuit breaker guarding one external dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Arc<Mutex<CircuitBreakerState>>,
}

#[derive(Debug)]
struct CircuitBreakerState {
    current_state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    half_open_requests: u32,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Arc::new(Mutex::new(CircuitBreakerState {
                current_state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                half_open_requests: 0,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Execute an operation with circuit breaker protection and the request timeout
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: ResilientError,
    {
        if !self.can_execute().await {
            tracing::debug!("Circuit '{}' is open, rejecting request", self.name);
            return Err(E::circuit_open());
        }

        match tokio::time::timeout(self.config.request_timeout, operation()).await {
            Ok(Ok(success)) => {
                self.on_success().await;
                Ok(success)
            }
            Ok(Err(error)) => {
                self.on_failure().await;
                Err(error)
            }
            Err(_) => {
                self.on_failure().await;
                Err(E::timed_out(self.config.request_timeout.as_secs()))
            }
        }
    }

    async fn can_execute(&self) -> bool {
        let mut state = self.state.lock().await;

        match state.current_state {
            CircuitState::Closed => true,
            CircuitState::Open => match state.last_failure_time {
                Some(last_failure) if last_failure.elapsed() >= self.config.recovery_timeout => {
                    state.current_state = CircuitState::HalfOpen;
                    state.half_open_requests = 1;
                    true
                }
                _ => false,
            },
            CircuitState::HalfOpen => {
                if state.half_open_requests < self.config.half_open_max_requests {
                    state.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.lock().await;
        state.current_state = CircuitState::Closed;
        state.failure_count = 0;
        state.half_open_requests = 0;
    }

    async fn on_failure(&self) {
        let mut state = self.state.lock().await;

        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        match state.current_state {
            CircuitState::Closed => {
                if state.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        "Circuit '{}' opened after {} consecutive failures",
                        self.name,
                        state.failure_count
                    );
                    state.current_state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                // Any failure while probing re-opens the circuit
                state.current_state = CircuitState::Open;
                state.half_open_requests = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.state.lock().await.current_state
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.lock().await;
        CircuitBreakerStats {
            name: self.name,
            state: state.current_state,
            failure_count: state.failure_count,
        }
    }
}

/// Snapshot of a circuit breaker for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub name: &'static str,
    pub state: CircuitState,
    pub failure_count: u32,
}

/// Retry configuration for exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Execute an operation with exponential backoff retry logic
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: ResilientError,
{
    let mut attempts = 0;
    let mut delay = config.initial_delay;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempts >= config.max_attempts || !error.is_retryable() {
                    return Err(error);
                }

                tracing::debug!("Attempt {} failed ({}), retrying in {:?}", attempts, error, delay);
                tokio::time::sleep(delay).await;

                delay = std::cmp::min(
                    Duration::from_millis(
                        (delay.as_millis() as f64 * config.backoff_multiplier) as u64,
                    ),
                    config.max_delay,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> CollectionError {
        CollectionError::Api(ApiError::Http {
            status: 500,
            message: "Internal Server Error".to_string(),
        })
    }

    fn fast_config(failure_threshold: u32, recovery_timeout: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout,
            half_open_max_requests: 2,
            request_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_on_failures() {
        let breaker = CircuitBreaker::new("osv", fast_config(2, Duration::from_millis(100)));
        assert_eq!(breaker.get_state().await, CircuitState::Closed);

        let _ = breaker
            .execute(|| async { Err::<(), _>(server_error()) })
            .await;
        assert_eq!(breaker.get_state().await, CircuitState::Closed);

        let _ = breaker
            .execute(|| async { Err::<(), _>(server_error()) })
            .await;
        assert_eq!(breaker.get_state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_circuit_breaker_rejects_when_open() {
        let breaker = CircuitBreaker::new("github", fast_config(1, Duration::from_secs(10)));
        let _ = breaker
            .execute(|| async { Err::<(), _>(server_error()) })
            .await;

        let result = breaker
            .execute(|| async { Ok::<(), CollectionError>(()) })
            .await;
        assert!(matches!(
            result,
            Err(CollectionError::Api(ApiError::CircuitOpen))
        ));
    }

    #[tokio::test]
    async fn test_open_circuit_is_not_retried() {
        let breaker = CircuitBreaker::new("github", fast_config(1, Duration::from_secs(10)));
        let _ = breaker
            .execute(|| async { Err::<(), _>(server_error()) })
            .await;

        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 1.0,
        };
        let calls = Arc::new(AtomicU32::new(0));

        let started = Instant::now();
        let result = retry_with_backoff(&config, || {
            let calls = calls.clone();
            breaker.execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<(), CollectionError>(())
            })
        })
        .await;

        assert!(matches!(
            result,
            Err(CollectionError::Api(ApiError::CircuitOpen))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_circuit_breaker_half_open_recovery() {
        let breaker = CircuitBreaker::new("osv", fast_config(1, Duration::from_millis(50)));
        let _ = breaker
            .execute(|| async { Err::<(), _>(server_error()) })
            .await;
        assert_eq!(breaker.get_state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let result = breaker
            .execute(|| async { Ok::<(), CollectionError>(()) })
            .await;
        assert!(result.is_ok());
        assert_eq!(breaker.stats().await.failure_count, 0);
        assert_eq!(breaker.get_state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_breaker_timeout() {
        let breaker = CircuitBreaker::new(
            "advisory",
            CircuitBreakerConfig {
                request_timeout: Duration::from_millis(50),
                ..fast_config(1, Duration::from_millis(100))
            },
        );

        let result = breaker
            .execute(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<(), AdvisoryError>(())
            })
            .await;

        // 50ms rounds down to 0 seconds
        assert!(matches!(result, Err(AdvisoryError::Timeout { seconds: 0 })));
    }

    #[tokio::test]
    async fn test_retry_with_backoff_success() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(1),
            ..RetryConfig::default()
        };
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(&config, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_at_max_attempts() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
        };
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(&config, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(&RetryConfig::default(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AdvisoryError::MissingApiKey)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_retryable() {
        assert!(CollectionError::Timeout { seconds: 30 }.is_retryable());
        assert!(CollectionError::RateLimit { api: "GitHub".to_string() }.is_retryable());
        assert!(server_error().is_retryable());
        assert!(
            CollectionError::Api(ApiError::Http {
                status: 429,
                message: "Too Many Requests".to_string()
            })
            .is_retryable()
        );
        assert!(
            !CollectionError::Api(ApiError::Http {
                status: 404,
                message: "Not Found".to_string()
            })
            .is_retryable()
        );
        assert!(!CollectionError::Api(ApiError::Authentication).is_retryable());
        assert!(!AdvisoryError::EmptyResponse.is_retryable());
        assert!(AdvisoryError::Api(ApiError::ServiceUnavailable).is_retryable());
        assert!(!AdvisoryError::Api(ApiError::CircuitOpen).is_retryable());
        assert!(!CollectionError::Api(ApiError::CircuitOpen).is_retryable());
    }
}

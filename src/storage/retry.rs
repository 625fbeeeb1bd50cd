//! Retry wrapper for existence oracles backed by a remote store.
//!
//! The generator itself never retries; wrap the oracle when transient
//! transport failures should be absorbed.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::contracts::ExistenceOracle;

/// Configuration for oracle retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    /// Creates a RetryConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STAFFMAIL_ORACLE_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `STAFFMAIL_ORACLE_RETRY_INITIAL_MS`: Initial backoff delay in ms (default: 50)
    /// - `STAFFMAIL_ORACLE_RETRY_MAX_MS`: Maximum backoff delay in ms (default: 2000)
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_retries: std::env::var("STAFFMAIL_ORACLE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_retries),
            initial_delay_ms: std::env::var("STAFFMAIL_ORACLE_RETRY_INITIAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.initial_delay_ms),
            max_delay_ms: std::env::var("STAFFMAIL_ORACLE_RETRY_MAX_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_delay_ms),
        }
    }

    /// Creates an exponential backoff builder with jitter.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Classifies oracle errors as transient.
///
/// Transient errors include:
/// - Network issues (timeout, connection reset, connection refused, broken pipe)
/// - Service unavailability (503, service unavailable, temporarily unavailable)
/// - Throttling (429, too many requests, rate limit)
pub fn is_transient_error(err: &str) -> bool {
    let transient_patterns = [
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "broken pipe",
        "503",
        "service unavailable",
        "temporarily unavailable",
        "429",
        "too many requests",
        "rate limit",
    ];
    let err_lower = err.to_lowercase();
    transient_patterns.iter().any(|p| err_lower.contains(p))
}

/// Oracle that retries transient failures of the wrapped oracle.
///
/// Non-transient errors and the final transient error are returned unchanged.
pub struct RetryingOracle<O> {
    inner: O,
    config: RetryConfig,
}

impl<O: ExistenceOracle> RetryingOracle<O> {
    pub fn new(inner: O, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: ExistenceOracle> ExistenceOracle for RetryingOracle<O> {
    type Error = O::Error;

    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let backoff = self.config.backoff();
        async move {
            (|| self.inner.exists(address))
                .retry(backoff)
                .when(|e: &O::Error| is_transient_error(&e.to_string()))
                .notify(|err: &O::Error, dur: Duration| {
                    tracing::warn!(
                        address = %address,
                        error = %err,
                        retry_in = ?dur,
                        "Existence check failed, retrying"
                    );
                })
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FlakyError(String);

    /// Fails `failures` times with `message`, then answers `false`.
    struct FlakyOracle {
        failures: usize,
        message: &'static str,
        calls: AtomicUsize,
    }

    impl FlakyOracle {
        fn new(failures: usize, message: &'static str) -> Self {
            Self {
                failures,
                message,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ExistenceOracle for FlakyOracle {
        type Error = FlakyError;

        async fn exists(&self, _address: &str) -> Result<bool, FlakyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(FlakyError(self.message.to_string()));
            }
            Ok(false)
        }
    }

    fn fast_config(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 50);
        assert_eq!(config.max_delay_ms, 2_000);
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_error("Connection timed out"));
        assert!(is_transient_error("connection reset by peer"));
        assert!(is_transient_error("503 Service Unavailable"));
        assert!(is_transient_error("429 Too Many Requests"));
        assert!(is_transient_error("rate limit exceeded"));
        assert!(!is_transient_error("permission denied for table profiles"));
        assert!(!is_transient_error("invalid JWT"));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let oracle = RetryingOracle::new(FlakyOracle::new(2, "connection reset"), fast_config(3));
        assert!(!oracle.exists("asoto@example.org").await.unwrap());
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let oracle = RetryingOracle::new(FlakyOracle::new(10, "timeout"), fast_config(2));
        let err = oracle.exists("asoto@example.org").await.unwrap_err();
        assert_eq!(err.0, "timeout");
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let oracle = RetryingOracle::new(FlakyOracle::new(1, "permission denied"), fast_config(5));
        assert!(oracle.exists("asoto@example.org").await.is_err());
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_env_with_custom_values() {
        std::env::set_var("STAFFMAIL_ORACLE_MAX_RETRIES", "7");
        std::env::set_var("STAFFMAIL_ORACLE_RETRY_INITIAL_MS", "not_a_number");

        let config = RetryConfig::from_env();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.initial_delay_ms, 50);

        std::env::remove_var("STAFFMAIL_ORACLE_MAX_RETRIES");
        std::env::remove_var("STAFFMAIL_ORACLE_RETRY_INITIAL_MS");
    }
}

//! Bounded retry around any completion client

use super::{CompletionClient, LlmError, LlmProvider};
use crate::config::LlmConfig;
use crate::metrics;
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Retry schedule for transient completion failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        // Attempt count bounds the loop, not elapsed time
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff.max(self.initial_backoff))
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Completion client that retries transient failures with exponential backoff
pub struct RetryingClient {
    inner: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn CompletionClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionClient for RetryingClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let start = Instant::now();
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let inner = &self.inner;
        let max_retries = self.policy.max_retries;

        let result = backoff::future::retry(self.policy.backoff(), move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            match inner.complete(prompt).await {
                Ok(text) => Ok(text),
                Err(err) if err.is_transient() && attempt < max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %err,
                        "Completion attempt failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await;

        let total_attempts = counter.load(Ordering::SeqCst);
        metrics::record_completion(
            start.elapsed().as_secs_f64(),
            self.inner.provider().as_str(),
            self.inner.model_name(),
            result.is_ok(),
            total_attempts,
        );

        if let Err(err) = &result {
            tracing::error!(
                provider = %self.inner.provider(),
                model = self.inner.model_name(),
                attempts = total_attempts,
                error = %err,
                "Completion failed"
            );
        }

        result
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn provider(&self) -> LlmProvider {
        self.inner.provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails with the given error until `failures` calls have been made
    struct FlakyClient {
        failures: u32,
        calls: AtomicU32,
        transient: bool,
    }

    impl FlakyClient {
        fn new(failures: u32, transient: bool) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                transient,
            }
        }
    }

    #[async_trait]
    impl CompletionClient for FlakyClient {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.transient {
                    Err(LlmError::Upstream {
                        status: 503,
                        body: "unavailable".into(),
                    })
                } else {
                    Err(LlmError::Upstream {
                        status: 401,
                        body: "bad key".into(),
                    })
                }
            } else {
                Ok("done".into())
            }
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Mock
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let flaky = Arc::new(FlakyClient::new(2, true));
        let client = RetryingClient::new(flaky.clone(), policy(2));

        assert_eq!(client.complete("prompt").await.unwrap(), "done");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let flaky = Arc::new(FlakyClient::new(10, true));
        let client = RetryingClient::new(flaky.clone(), policy(2));

        assert!(client.complete("prompt").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let flaky = Arc::new(FlakyClient::new(1, false));
        let client = RetryingClient::new(flaky.clone(), policy(5));

        assert!(matches!(
            client.complete("prompt").await,
            Err(LlmError::Upstream { status: 401, .. })
        ));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let flaky = Arc::new(FlakyClient::new(1, true));
        let client = RetryingClient::new(flaky.clone(), RetryPolicy::none());

        assert!(client.complete("prompt").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}

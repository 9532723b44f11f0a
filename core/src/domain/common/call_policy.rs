use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::common::entities::app_errors::CoreError;

/// Timeout and retry settings applied to one outbound provider call.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub provider: String,
    pub max_attempts: u32,
    /// Linear backoff step: the n-th retry waits `n * backoff_step`.
    pub backoff_step: Duration,
    pub timeout: Duration,
    pub should_retry: fn(&CoreError) -> bool,
}

impl CallPolicy {
    /// One attempt, bounded by `timeout`.
    pub fn single_shot(provider: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider: provider.into(),
            max_attempts: 1,
            backoff_step: Duration::ZERO,
            timeout,
            should_retry: CoreError::is_retryable,
        }
    }

    pub fn with_retries(
        provider: impl Into<String>,
        max_attempts: u32,
        backoff_step: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: provider.into(),
            max_attempts: max_attempts.max(1),
            backoff_step,
            timeout,
            should_retry: CoreError::is_retryable,
        }
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Runs `operation` under the policy: each attempt is cut off at the policy
/// timeout, retryable failures are retried with linear backoff, anything else
/// is returned immediately.
pub async fn call_with_policy<T, F, Fut>(policy: &CallPolicy, mut operation: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::ProviderTimeout {
                provider: policy.provider.clone(),
                timeout_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && (policy.should_retry)(&error) => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    provider = %policy.provider,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn server_error() -> CoreError {
        CoreError::ProviderServerError {
            provider: "Gemini".to_string(),
            status: 503,
            message: "overloaded".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_linear_backoff() {
        let policy =
            CallPolicy::with_retries("Gemini", 3, Duration::from_secs(1), Duration::from_secs(15));
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), CoreError> = call_with_policy(&policy, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            }
        })
        .await;

        assert!(matches!(result, Err(CoreError::ProviderServerError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let policy =
            CallPolicy::with_retries("Gemini", 3, Duration::from_millis(500), Duration::from_secs(15));
        let calls = Arc::new(AtomicU32::new(0));

        let result = call_with_policy(&policy, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok("dish")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("dish"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_errors_are_not_retried() {
        let policy =
            CallPolicy::with_retries("Gemini", 3, Duration::from_secs(1), Duration::from_secs(15));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), CoreError> = call_with_policy(&policy, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::ProviderCreditsExhausted {
                    provider: "Gemini".to_string(),
                    message: "billing".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(CoreError::ProviderCreditsExhausted { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_provider_failure() {
        let policy = CallPolicy::single_shot("Clarifai", Duration::from_secs(10));

        let result: Result<(), CoreError> = call_with_policy(&policy, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(CoreError::ProviderTimeout {
                provider: "Clarifai".to_string(),
                timeout_ms: 10_000,
            })
        );
    }
}

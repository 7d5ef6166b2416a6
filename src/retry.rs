//! Bounded retry for transient collaborator failures

use crate::error::AssistantError;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Run `operation`, retrying up to `max_retries` extra times while the error is retryable.
/// Delays grow 200ms, 400ms, 800ms... capped at 10s, with jitter.
pub async fn retry_with_backoff<F, Fut, T>(
    label: &str,
    max_retries: usize,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(100)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(max_retries);

    RetryIf::spawn(strategy, operation, |e: &AssistantError| {
        let retry = e.is_retryable();
        if retry {
            warn!(service = label, error = %e, "Retryable failure, backing off");
        }
        retry
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);

        let result = retry_with_backoff("test", 3, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(AssistantError::Api {
                        status_code: 503,
                        message: "unavailable".into(),
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_failure() {
        let calls = AtomicUsize::new(0);

        let result: Result<()> = retry_with_backoff("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AssistantError::Configuration("missing key".into())) }
        })
        .await;

        assert!(matches!(result, Err(AssistantError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicUsize::new(0);

        let result: Result<()> = retry_with_backoff("test", 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AssistantError::Api {
                    status_code: 500,
                    message: "boom".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

use crate::errors::ServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with linear backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Attempt n waits `backoff_step * n` before retrying.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            backoff_step,
        }
    }
}

/// True for provider rate-limit responses. Only these are worth retrying;
/// anything else fails fast.
pub fn is_rate_limit(err: &ServiceError) -> bool {
    if matches!(err, ServiceError::RateLimitExceeded) {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("429") || msg.contains("rate limit") || msg.contains("too many requests")
}

/// Runs `op` up to `policy.max_attempts` times, sleeping between attempts
/// with linear backoff, but only when `is_retryable` accepts the error.
pub async fn retry_with_backoff<T, F, Fut, P>(
    policy: RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
    P: Fn(&ServiceError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let wait = policy.backoff_step * attempt;
                warn!(
                    "Retryable error (attempt {}/{}), waiting {:?}: {}",
                    attempt, policy.max_attempts, wait, err
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn rate_limit_predicate_matches_provider_messages() {
        assert!(is_rate_limit(&ServiceError::RateLimitExceeded));
        assert!(is_rate_limit(&ServiceError::ExternalServiceError(
            "HTTP 429 Too Many Requests".into()
        )));
        assert!(!is_rate_limit(&ServiceError::ExternalServiceError(
            "connection refused".into()
        )));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result = retry_with_backoff(policy, is_rate_limit, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ServiceError::RateLimitExceeded)
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<u32, _> = retry_with_backoff(policy, is_rate_limit, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::ExternalServiceError("boom".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<u32, _> = retry_with_backoff(policy, is_rate_limit, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::RateLimitExceeded) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

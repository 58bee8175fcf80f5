//! Retry and timeout wrappers for outgoing requests.
//!
//! Production calls compose them as `retry(timeout(send))`, so every attempt
//! gets its own time budget.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Classifies failures for [`with_retry`].
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ApiError {
    /// Network failures, 5xx answers and timeouts. A 2xx with an unusable
    /// body already reached the server and is never repeated.
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => true,
            ApiError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Run `f` up to `max_retries + 1` times with exponential backoff.
///
/// Stops early on a non-retryable error. After the last attempt the final
/// error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(f: F, max_retries: u32, base_delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    retry_when(f, max_retries, base_delay, E::is_retryable).await
}

/// [`with_retry`] with an explicit retry predicate.
pub async fn retry_when<T, E, F, Fut, P>(
    mut f: F,
    max_retries: u32,
    base_delay: Duration,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if retries >= max_retries || !should_retry(&err) {
                    return Err(err);
                }
                retries += 1;
                let delay = backoff_delay(base_delay, retries);
                tracing::debug!(
                    retry = retries,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Fail with [`ApiError::Timeout`] if `fut` does not finish within `timeout`.
///
/// The inner future is dropped on timeout. Anything it already sent may
/// still be processed by the server.
pub async fn with_timeout<T, Fut>(fut: Fut, timeout: Duration) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "request timed out");
            Err(ApiError::Timeout { timeout })
        }
    }
}

/// How a single logical call is retried and timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Budget for each individual attempt.
    pub timeout: Duration,
    /// Whether a timed-out attempt may be repeated. Off for calls that are not
    /// known to be idempotent, since the first attempt may have landed.
    pub retry_timeouts: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
            retry_timeouts: true,
        }
    }
}

impl RetryPolicy {
    /// Policy for reads.
    pub fn idempotent() -> Self {
        Self::default()
    }

    /// Policy for writes: one retry, never after a timeout.
    pub fn mutating() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(15),
            retry_timeouts: false,
        }
    }

    /// Single attempt.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            timeout,
            retry_timeouts: false,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_timeouts(mut self, retry_timeouts: bool) -> Self {
        self.retry_timeouts = retry_timeouts;
        self
    }

    fn allows(&self, err: &ApiError) -> bool {
        err.is_retryable() && (self.retry_timeouts || !err.is_timeout())
    }

    /// Run `f` under this policy: each attempt is bounded by `timeout`,
    /// failed attempts are retried with exponential backoff.
    pub async fn run<T, F, Fut>(&self, mut f: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let timeout = self.timeout;
        retry_when(
            || with_timeout(f(), timeout),
            self.max_retries,
            self.base_delay,
            |err| self.allows(err),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn backoff_is_pure_exponential() {
        let base = Duration::from_millis(10);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(10));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(20));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(40));
        // Large retry counts saturate instead of overflowing.
        assert_eq!(backoff_delay(base, 64), base.saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_generic_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = with_retry(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(ApiError::network("connection reset"))
                    } else {
                        Ok("done")
                    }
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), ApiError> = with_retry(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::http(401, "Unauthorized"))
                }
            },
            5,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap_err().status(), Some(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delivered_answers_are_not_retryable() {
        assert!(ApiError::network("reset").is_retryable());
        assert!(ApiError::http(502, "Bad gateway").is_retryable());
        assert!(!ApiError::http(404, "Not found").is_retryable());
        assert!(!ApiError::UnexpectedBody { status: 200 }.is_retryable());
        assert!(
            !ApiError::Decode {
                message: "missing field".into()
            }
            .is_retryable()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn last_error_is_returned_after_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), ApiError> = with_retry(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::http(500, format!("attempt {n}")))
                }
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().to_string(), "attempt 2");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_before_slow_future() {
        let started = Instant::now();
        let result = with_timeout(
            async {
                tokio::time::sleep(Duration::from_millis(2000)).await;
                Ok::<_, ApiError>(())
            },
            Duration::from_millis(100),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.status(), Some(408));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn policy_gives_each_attempt_its_own_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(50));

        let result = policy
            .run(|| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok::<_, ApiError>(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn mutating_policy_does_not_repeat_timeouts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::mutating().with_timeout(Duration::from_millis(50));

        let result: Result<(), ApiError> = policy
            .run(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mutating_policy_retries_server_errors_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::mutating();

        let result: Result<(), ApiError> = policy
            .run(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::http(502, "Bad gateway"))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(502));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

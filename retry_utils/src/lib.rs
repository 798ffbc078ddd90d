use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Classification of transport failures for retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 429 from the render service - retry with longer delays
    RateLimit,
    /// 5xx from the render service or the origin site (including 521
    /// origin-down, which the service surfaces as a temporary error)
    OriginError,
    /// Request-level timeout - retry with shorter delays
    Timeout,
    /// Anything else - don't retry
    Fatal,
}

/// Delay schedule per failure class
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_attempts: u32,
    pub rate_limit_delays_ms: Vec<u64>,
    pub origin_error_delays_ms: Vec<u64>,
    pub timeout_delays_ms: Vec<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_delays_ms: vec![1000, 2000, 4000],
            origin_error_delays_ms: vec![500, 1000, 2000],
            timeout_delays_ms: vec![500, 1000],
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32, class: FailureClass) -> Option<Duration> {
        let delays = match class {
            FailureClass::RateLimit => &self.rate_limit_delays_ms,
            FailureClass::OriginError => &self.origin_error_delays_ms,
            FailureClass::Timeout => &self.timeout_delays_ms,
            FailureClass::Fatal => return None,
        };

        delays
            .get(attempt as usize)
            .map(|&ms| Duration::from_millis(ms))
    }
}

/// Retry an async transport operation with a bounded, class-specific backoff.
///
/// This covers transport-level failures only (the render service being
/// unreachable, rate limited, or reporting the origin as down). Page
/// readiness has its own retry loop in the pipeline driver and is a
/// separate concern.
pub async fn retry_transport<F, Fut, T, E>(
    mut operation: F,
    policy: &RetryPolicy,
    classify: impl Fn(&E) -> FailureClass,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("✅ Transport recovered after {} retry attempts", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let class = classify(&e);

                if class == FailureClass::Fatal {
                    error!("❌ Transport failed with non-retryable error: {}", e);
                    return Err(e);
                }

                if attempt >= policy.max_attempts {
                    error!(
                        "❌ Transport failed after {} attempts (retries exhausted): {}",
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = match policy.delay_for(attempt, class) {
                    Some(d) => d,
                    None => {
                        error!("❌ No delay configured for attempt {}, failing", attempt);
                        return Err(e);
                    }
                };

                warn!(
                    "⚠️  Transport failure (attempt {}/{}): {} - retrying in {}ms ({:?})",
                    attempt + 1,
                    policy.max_attempts + 1,
                    e,
                    delay.as_millis(),
                    class
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        kind: &'static str,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.kind)
        }
    }

    fn short_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            rate_limit_delays_ms: vec![5, 10],
            origin_error_delays_ms: vec![5, 10],
            timeout_delays_ms: vec![5],
        }
    }

    #[tokio::test]
    async fn immediate_success_does_not_retry() {
        let result = retry_transport(
            || async { Ok::<_, TestError>(42) },
            &RetryPolicy::default(),
            |_| FailureClass::Fatal,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn fatal_error_fails_on_first_attempt() {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let result = retry_transport(
            move || async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError { kind: "bad request" })
            },
            &short_policy(),
            |_| FailureClass::Fatal,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn origin_error_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let result = retry_transport(
            move || async move {
                let n = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TestError { kind: "origin down" })
                } else {
                    Ok(42)
                }
            },
            &short_policy(),
            |_| FailureClass::OriginError,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_error() {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let result = retry_transport(
            move || async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError { kind: "rate limit" })
            },
            &short_policy(),
            |_| FailureClass::RateLimit,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // initial + 2 retries
    }
}

//! Bounded retry with backoff for optimistic-concurrency write paths

use std::future::Future;
use std::time::Duration;

/// Outcome of a retried operation that never produced a success value
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted {
        /// How many attempts were made
        attempts: u32,
        /// The error from the final attempt
        last: E,
    },
    /// The operation failed with a non-retryable error
    Fatal(E),
}

/// Linear backoff: 100ms times the attempt number
pub fn backoff_100ms_linear(attempt: u32) -> Duration {
    Duration::from_millis(100 * u64::from(attempt))
}

/// Run `op` up to `max_attempts` times, sleeping `backoff(attempt)` between
/// retryable failures
///
/// `is_retryable` decides which errors are worth another attempt; anything
/// else aborts immediately as [`RetryError::Fatal`]. Each attempt re-invokes
/// `op` from scratch, so the operation must reload fresh state and reapply
/// its intended change rather than replay stale data.
pub async fn retry<T, E, F, Fut>(
    max_attempts: u32,
    backoff: impl Fn(u32) -> Duration,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if is_retryable(&error) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                let wait = backoff(attempt);
                tracing::debug!(
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(wait).await;
            }
            Err(error) => return Err(RetryError::Fatal(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Conflict,
        Broken,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Conflict => write!(f, "conflict"),
                TestError::Broken => write!(f, "broken"),
            }
        }
    }

    fn no_backoff(_attempt: u32) -> Duration {
        Duration::from_millis(0)
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result: Result<u32, RetryError<TestError>> =
            retry(3, no_backoff, |_| true, || async { Ok(42) }).await;
        assert!(matches!(result, Ok(42)));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<TestError>> = retry(
            3,
            no_backoff,
            |e| matches!(e, TestError::Conflict),
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Conflict)
                } else {
                    Ok(7)
                }
            },
        )
        .await;
        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<TestError>> = retry(
            3,
            no_backoff,
            |e| matches!(e, TestError::Conflict),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Conflict)
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<TestError>> = retry(
            3,
            no_backoff,
            |e| matches!(e, TestError::Conflict),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Broken)
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Fatal(TestError::Broken))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_linear_backoff() {
        assert_eq!(backoff_100ms_linear(1), Duration::from_millis(100));
        assert_eq!(backoff_100ms_linear(3), Duration::from_millis(300));
    }
}

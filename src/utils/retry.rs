//! Bounded retries with exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::RetrySettings;

/// Backoff schedule for one remote operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts in total, the first call included. Never below 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier.max(1.0),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Wait before retry number `retry` (1 for the first retry), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Gave up, either out of attempts or on an error that is not retryable.
    Failed { last_error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }
}

/// Errors that may clear up if the same call is made again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let error = match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(error) => error,
        };

        if attempt >= config.max_attempts || !error.is_retryable() {
            return RetryResult::Failed {
                last_error: error,
                attempts: attempt,
            };
        }

        let base = config.backoff(attempt);
        let wait = base + jitter(base / 4);
        tracing::debug!(
            attempt,
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "transient error, retrying"
        );
        sleep(wait).await;
        attempt += 1;
    }
}

/// Up to `max` of clock-derived noise so concurrent callers spread out.
fn jitter(max: Duration) -> Duration {
    let max_nanos = max.as_nanos() as u64;
    if max_nanos == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    Duration::from_nanos(nanos % max_nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FlakyError {
        transient: bool,
    }

    impl std::fmt::Display for FlakyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            if self.transient {
                f.write_str("server busy")
            } else {
                f.write_str("bad request")
            }
        }
    }

    impl Retryable for FlakyError {
        fn is_retryable(&self) -> bool {
            self.transient
        }
    }

    fn quick(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4))
    }

    #[test]
    fn test_default_schedule() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(800));
        assert_eq!(config.backoff(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_is_bounded() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(50)) < Duration::from_millis(50));
        }
    }

    #[test]
    fn test_from_settings_clamps_attempts() {
        let settings = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryConfig::from(&settings).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, FlakyError>(7)
        })
        .await;

        assert!(matches!(result, RetryResult::Success(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FlakyError { transient: true })
            } else {
                Ok("embedded")
            }
        })
        .await;

        assert_eq!(result.into_result().unwrap(), "embedded");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_at_once() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(FlakyError { transient: false })
        })
        .await;

        assert!(matches!(result, RetryResult::Failed { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(FlakyError { transient: true })
        })
        .await;

        match result {
            RetryResult::Failed { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.transient);
            }
            RetryResult::Success(_) => panic!("expected failure"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

// src/pipeline/retry.rs

//! Retry policy for remote fetches.
//!
//! Only transient failures ([`ErrorKind::is_retryable`]) are retried. The
//! delay doubles after every failed attempt, capped at `max_delay`.
//!
//! [`ErrorKind::is_retryable`]: crate::error::ErrorKind::is_retryable

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Whether a failure on attempt `attempt` (1-based) should be retried.
    pub fn should_retry(&self, err: &AppError, attempt: u32) -> bool {
        attempt < self.max_attempts && err.is_retryable()
    }

    /// Wait before attempt `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails permanently or runs out of
    /// attempts. Returns the last result and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> (Result<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return (Ok(value), attempt),
                Err(err) if self.should_retry(&err, attempt) => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt,
                        self.max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlatformId;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }

    fn timeout() -> AppError {
        AppError::Timeout {
            url: "https://codeforces.com/api/user.info".into(),
        }
    }

    #[test]
    fn test_backoff_growth() {
        let p = policy(10);
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(400));
        assert_eq!(p.delay_for(5), Duration::from_millis(1000));
        assert_eq!(p.delay_for(64), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_decisions() {
        let p = policy(3);
        assert!(p.should_retry(&timeout(), 1));
        assert!(p.should_retry(&timeout(), 2));
        assert!(!p.should_retry(&timeout(), 3));

        let rate_limited = AppError::RateLimited {
            platform: PlatformId::Codeforces,
        };
        assert!(p.should_retry(&rate_limited, 1));
        assert!(!p.should_retry(&AppError::parse(PlatformId::Timus, "layout changed"), 1));
        assert!(!p.should_retry(&AppError::not_found(PlatformId::CodeChef, "user"), 1));
        assert!(!p.should_retry(&AppError::invalid("bad handle"), 1));
        assert!(
            p.should_retry(
                &AppError::HttpStatus {
                    status: 503,
                    url: String::new()
                },
                1
            )
        );
        assert!(
            !p.should_retry(
                &AppError::HttpStatus {
                    status: 403,
                    url: String::new()
                },
                1
            )
        );
    }

    #[test]
    fn test_from_config_clamps_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            base_delay_ms: 10,
            max_delay_ms: 20,
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let (result, attempts) = policy(3)
            .run("fetch", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(timeout())
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_permanent_failure() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let (result, attempts) = policy(5)
            .run("fetch", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AppError::parse(PlatformId::Timus, "layout changed"))
            })
            .await;
        assert!(matches!(result, Err(AppError::Parse { .. })));
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_max_attempts() {
        let (result, attempts) = policy(2)
            .run("fetch", || async { Err::<(), _>(timeout()) })
            .await;
        assert!(matches!(result, Err(AppError::Timeout { .. })));
        assert_eq!(attempts, 2);
    }
}

// src/error_recovery.rs
//! Retry with linear backoff for transient network failures.

use crate::constants::{RETRY_BACKOFF_CAP, RETRY_BACKOFF_STEP};
use crate::error::AppError;
use std::time::Duration;

/// How patiently transient failures are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Wait grows by this much per failed attempt.
    pub step: Duration,
    /// Wait never exceeds this.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            step: RETRY_BACKOFF_STEP,
            max_delay: RETRY_BACKOFF_CAP,
        }
    }
}

impl RetryPolicy {
    /// Same backoff, bounded to `max_attempts` total attempts.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    /// Wait before the next attempt after `attempt` attempts have failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_delay)
    }

    fn allows_another(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

/// Retries an async operation while it fails with a transient error.
///
/// Non-transient errors return immediately. When the policy is exhausted the
/// last transient error is returned.
pub async fn retry_transient<F, T, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && policy.allows_another(attempt) => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "{} failed ({}), retry #{} in {:?}",
                    operation_name,
                    e,
                    attempt,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_transient() {
                    log::error!("{} gave up after {} attempts: {}", operation_name, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

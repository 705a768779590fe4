//! Bounded retry with exponential backoff for idempotent upstream calls.
//!
//! Retried: timeouts, connection failures, 5xx, 408 and 429.
//! Not retried: every other 4xx, decode errors, anything that isn't an HTTP failure.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;

use crate::error::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based): initial * 2^retry, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Decide whether an error from an upstream call is worth another attempt.
pub fn is_transient(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(http) = cause.downcast_ref::<HttpError>() {
            return http.is_retryable();
        }
        if let Some(req) = cause.downcast_ref::<reqwest::Error>() {
            if req.is_timeout() || req.is_connect() {
                return true;
            }
            return req.status().is_some_and(is_retryable_status);
        }
    }
    false
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    what,
                    attempt,
                    max_attempts = policy.max_attempts,
                    ?delay,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt > 1 {
                    return Err(err.context(format!("{what} failed after {attempt} attempts")));
                }
                return Err(err);
            }
        }
    }
}

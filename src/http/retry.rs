//! Retry with backoff bounded by an elapsed-time budget
//!
//! The executor runs an attempt closure until it succeeds, fails with a
//! non-retryable error, or the page window runs out. The window starts at the
//! first attempt of each call to [`RetryExecutor::execute`], so every page of
//! a paginated traversal gets a fresh window.

use crate::error::{Error, Result};
use crate::types::BackoffType;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Status codes retried by default
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 6] = [
    408, // Request Timeout
    429, // Too Many Requests
    502, // Bad Gateway
    503, // Service Unavailable
    504, // Gateway Timeout
    520, // Unknown upstream error
];

/// Default retry window per page fetch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7200);

/// Default delay before the first retry
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Default cap on a single backoff delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Retry window and retryable statuses for one logical fetch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum elapsed time for the attempts of a single page fetch
    pub timeout: Duration,
    /// Non-2xx statuses that are retried
    pub retry_on: BTreeSet<u16>,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_on: DEFAULT_RETRY_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryBudget {
    /// Create a budget with the given window and status codes
    pub fn new(timeout: Duration, retry_on: impl IntoIterator<Item = u16>) -> Self {
        Self {
            timeout,
            retry_on: retry_on.into_iter().collect(),
        }
    }

    /// Replace the window, keeping the status codes
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the retryable status codes
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = retry_on.into_iter().collect();
        self
    }

    /// Check if a status code is retryable under this budget
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }
}

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Shape of the delay curve
    pub backoff_type: BackoffType,
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound on any single delay
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl BackoffPolicy {
    /// Create a backoff policy
    pub fn new(backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        Self {
            backoff_type,
            initial,
            max,
        }
    }

    /// Delay before retry number `retry` (0-based); non-decreasing in `retry`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial.saturating_mul(retry.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                self.initial.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max)
    }
}

/// Runs an attempt closure with backoff until success or budget exhaustion
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    backoff: BackoffPolicy,
}

impl RetryExecutor {
    /// Create an executor with the given backoff policy
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self { backoff }
    }

    /// Get the backoff policy
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run `attempt` until it succeeds or fails terminally
    ///
    /// `attempt` receives the 1-based attempt number. Retryable failures are
    /// transport errors and statuses in `budget.retry_on`; once the time since
    /// the first attempt reaches `budget.timeout` the last failure is wrapped
    /// in [`Error::BudgetExceeded`]. Delays never overshoot the window.
    pub async fn execute<T, F, Fut>(&self, budget: &RetryBudget, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let err = match attempt(attempts).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable(&budget.retry_on) {
                return Err(err);
            }

            let elapsed = started.elapsed();
            let remaining = budget.timeout.saturating_sub(elapsed);
            if remaining.is_zero() {
                warn!(
                    "Giving up after {} attempts in {:.3}s: {}",
                    attempts,
                    elapsed.as_secs_f64(),
                    err
                );
                return Err(Error::BudgetExceeded {
                    elapsed_ms: elapsed.as_millis() as u64,
                    attempts,
                    last: Box::new(err),
                });
            }

            let delay = self.backoff.delay_for(attempts - 1).min(remaining);
            warn!(
                "Attempt {} failed ({}), retrying in {:?}",
                attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

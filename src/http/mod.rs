//! HTTP module
//!
//! Authenticated GET with retry, exponential backoff and per-request
//! observability.
//!
//! # Features
//!
//! - **Automatic Retries**: transport errors and configurable status codes
//! - **Time Budget**: retries stop once a per-page window is spent
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Authentication**: every attempt carries a valid OAuth2 credential

mod fetcher;
mod observer;
mod retry;

pub use fetcher::AuthenticatedFetcher;
pub use observer::{RequestObserver, RequestSummary, TracingObserver};
pub use retry::{
    BackoffPolicy, RetryBudget, RetryExecutor, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF,
    DEFAULT_RETRY_STATUS_CODES, DEFAULT_TIMEOUT,
};

#[cfg(test)]
mod tests;

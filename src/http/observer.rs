//! Per-request observability hook
//!
//! Every HTTP attempt made by the client (token requests included) is reported
//! to a [`RequestObserver`] once it completes. The default observer writes one
//! summary line per attempt through `tracing`.

use reqwest::Method;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Summary of a single completed HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    /// HTTP method
    pub method: Method,
    /// Response status, `None` when the transport failed
    pub status: Option<u16>,
    /// Time from send to response headers (or failure)
    pub elapsed: Duration,
    /// Final request URL, including query string
    pub url: String,
}

impl RequestSummary {
    /// Summary for an attempt that produced a response
    pub fn new(method: Method, status: u16, elapsed: Duration, url: impl Into<String>) -> Self {
        Self {
            method,
            status: Some(status),
            elapsed,
            url: url.into(),
        }
    }

    /// Summary for an attempt that failed before a response arrived
    pub fn failed(method: Method, elapsed: Duration, url: impl Into<String>) -> Self {
        Self {
            method,
            status: None,
            elapsed,
            url: url.into(),
        }
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "[{}] [{}] [{:.3}] {}",
                self.method,
                status,
                self.elapsed.as_secs_f64(),
                self.url
            ),
            None => write!(
                f,
                "[{}] [ERR] [{:.3}] {}",
                self.method,
                self.elapsed.as_secs_f64(),
                self.url
            ),
        }
    }
}

/// Receives a summary after every HTTP attempt
pub trait RequestObserver: Send + Sync {
    /// Called synchronously once the attempt has a status or has failed
    fn on_request(&self, summary: &RequestSummary);
}

/// Observer that logs each summary at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, summary: &RequestSummary) {
        info!("{summary}");
    }
}

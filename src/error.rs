//! Error types for the API client
//!
//! Every public operation returns `Result<T, Error>`. The variants map onto
//! the failure classes the retry loop cares about: transport failures,
//! HTTP status failures, an exhausted retry budget, and authentication
//! failures, which are never retried.

use std::collections::BTreeSet;
use thiserror::Error;

/// The main error type for the API client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token request failed: {0}")]
    TokenRequest(#[source] reqwest::Error),

    #[error("Malformed token response: {message}")]
    TokenResponse { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Gave up after {attempts} attempts in {elapsed_ms}ms: {last}")]
    BudgetExceeded {
        elapsed_ms: u64,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a token response error
    pub fn token_response(message: impl Into<String>) -> Self {
        Self::TokenResponse {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// HTTP status carried by this error, looking through an exhausted budget
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::BudgetExceeded { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Status of the last response seen before the retry budget ran out
    pub fn last_status(&self) -> Option<u16> {
        match self {
            Error::BudgetExceeded { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Check if this is an authentication failure
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. } | Error::TokenRequest(_) | Error::TokenResponse { .. }
        )
    }

    /// Check if this error is retryable given the set of retryable status codes
    ///
    /// Transport failures always are; a status error only when its code is in
    /// `retry_on`. Auth failures and everything else are fatal.
    pub fn is_retryable(&self, retry_on: &BTreeSet<u16>) -> bool {
        match self {
            Error::Http(e) => !e.is_builder() && !e.is_redirect(),
            Error::HttpStatus { status, .. } => retry_on.contains(status),
            _ => false,
        }
    }
}

/// Result type alias for the API client
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_codes() -> BTreeSet<u16> {
        [408, 429, 502, 503, 504, 520].into_iter().collect()
    }

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("client_id");
        assert_eq!(err.to_string(), "Missing required config field: client_id");

        let err = Error::http_status(404, "https://x/y", "Not found");
        assert_eq!(err.to_string(), "HTTP 404 from https://x/y: Not found");
    }

    #[test]
    fn test_is_retryable() {
        let codes = default_codes();
        assert!(Error::http_status(429, "", "").is_retryable(&codes));
        assert!(Error::http_status(503, "", "").is_retryable(&codes));
        assert!(Error::http_status(520, "", "").is_retryable(&codes));

        assert!(!Error::http_status(500, "", "").is_retryable(&codes));
        assert!(!Error::http_status(404, "", "").is_retryable(&codes));
        assert!(!Error::auth("bad secret").is_retryable(&codes));
        assert!(!Error::token_response("no token").is_retryable(&codes));
        assert!(!Error::config("test").is_retryable(&codes));
    }

    #[test]
    fn test_budget_exceeded_carries_last_status() {
        let err = Error::BudgetExceeded {
            elapsed_ms: 1200,
            attempts: 4,
            last: Box::new(Error::http_status(503, "https://x/", "busy")),
        };
        assert_eq!(err.last_status(), Some(503));
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("4 attempts"));
        assert!(!err.is_retryable(&default_codes()));
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::auth("x").is_auth());
        assert!(Error::token_response("x").is_auth());
        assert!(!Error::http_status(401, "", "").is_auth());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }

    #[test]
    fn test_converts_into_anyhow_with_source_chain() {
        let err = Error::BudgetExceeded {
            elapsed_ms: 300,
            attempts: 3,
            last: Box::new(Error::http_status(503, "https://x/", "busy")),
        };
        let err = anyhow::Error::from(err).context("Fetching pages failed");

        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0], "Fetching pages failed");
        assert_eq!(chain[2], "HTTP 503 from https://x/: busy");
    }
}

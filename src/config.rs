//! Client configuration
//!
//! `ClientConfig` holds the client identity, the retry policy and transport
//! settings. It can be built in code or loaded from a YAML/JSON file, either
//! at the top level or nested under an `edx-rest-api` section.

use crate::auth::ClientCredentials;
use crate::error::{Error, Result, ResultExt};
use crate::http::{
    BackoffPolicy, RetryBudget, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF,
    DEFAULT_RETRY_STATUS_CODES, DEFAULT_TIMEOUT,
};
use crate::types::{BackoffType, TokenType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Section name used when the client config is nested in a larger file
pub const CONFIG_SECTION: &str = "edx-rest-api";

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the OAuth2 token endpoint
    #[serde(default)]
    pub auth_url: String,

    /// OAuth2 client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: String,

    /// Token type to request (`jwt` or `bearer`)
    #[serde(default)]
    pub token_type: TokenType,

    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-request socket timeout; unset leaves the transport default
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("edx-api-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

impl ClientConfig {
    /// Create a config with default retry settings
    pub fn new(
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_type: TokenType::default(),
            retry: RetryConfig::default(),
            request_timeout_seconds: None,
            user_agent: default_user_agent(),
        }
    }

    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse a YAML (or JSON) document, with or without an `edx-rest-api` section
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
        let section = doc
            .get(CONFIG_SECTION)
            .or_else(|| doc.get("edx_rest_api"))
            .cloned()
            .unwrap_or(doc);
        Ok(serde_yaml::from_value(section)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Check that everything needed to authenticate is present
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.is_empty() {
            return Err(Error::missing_field("auth_url"));
        }
        url::Url::parse(&self.auth_url)?;

        if self.client_id.is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(Error::missing_field("client_secret"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::config(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        Ok(())
    }

    /// Client identity for the token manager
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(&self.auth_url, &self.client_id, &self.client_secret)
            .with_token_type(self.token_type)
    }

    /// Per-request socket timeout, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("retry", &self.retry)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retry window per page fetch, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Status codes that trigger a retry
    #[serde(default = "default_retry_on")]
    pub retry_on: Vec<u16>,

    /// Backoff curve
    #[serde(default)]
    pub backoff_type: BackoffType,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Cap on a single delay, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_retry_on() -> Vec<u16> {
    DEFAULT_RETRY_STATUS_CODES.to_vec()
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF.as_millis() as u64
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF.as_millis() as u64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retry_on: default_retry_on(),
            backoff_type: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Retry budget for one fetch call
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(
            Duration::from_secs(self.timeout_seconds),
            self.retry_on.iter().copied(),
        )
    }

    /// Backoff schedule
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.backoff_type,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for client config
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the token endpoint URL
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth_url = url.into();
        self
    }

    /// Set the client id
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = id.into();
        self
    }

    /// Set the client secret
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.client_secret = secret.into();
        self
    }

    /// Set the token type
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.config.token_type = token_type;
        self
    }

    /// Set the retry window per page
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.retry.timeout_seconds = timeout.as_secs();
        self
    }

    /// Set the retryable status codes
    pub fn retry_on(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retry.retry_on = codes.into_iter().collect();
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        let retry = &mut self.config.retry;
        retry.backoff_type = backoff_type;
        retry.initial_backoff_ms = initial.as_millis() as u64;
        retry.max_backoff_ms = max.as_millis() as u64;
        self
    }

    /// Set a per-request socket timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_seconds = Some(timeout.as_secs());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

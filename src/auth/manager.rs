//! Token manager
//!
//! Owns the cached credential and performs the client-credentials grant when
//! it is missing or expired.

use super::types::{ClientCredentials, Credential};
use crate::error::{Error, Result};
use crate::http::{RequestObserver, RequestSummary, TracingObserver};
use chrono::Utc;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::info;

/// Manages the OAuth2 client-credentials token lifecycle
pub struct TokenManager {
    /// Client identity
    credentials: ClientCredentials,
    /// Cached credential, `None` until the first request
    cached: Arc<RwLock<Option<Credential>>>,
    /// HTTP client for token requests
    http_client: Client,
    /// Receives a summary of every token request
    observer: Arc<dyn RequestObserver>,
}

impl TokenManager {
    /// Create a token manager with its own HTTP client
    pub fn new(credentials: ClientCredentials) -> Self {
        Self::with_client(credentials, Client::new(), Arc::new(TracingObserver))
    }

    /// Create a token manager sharing an HTTP client and observer
    pub fn with_client(
        credentials: ClientCredentials,
        http_client: Client,
        observer: Arc<dyn RequestObserver>,
    ) -> Self {
        Self {
            credentials,
            cached: Arc::new(RwLock::new(None)),
            http_client,
            observer,
        }
    }

    /// Get the client identity
    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Return a valid credential, requesting a new one if none is cached or
    /// the cached one has expired
    pub async fn ensure_valid_token(&self) -> Result<Credential> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.clone());
            }
        }

        info!("Token is expired or missing, requesting a new one");
        let token = self.request_token().await?;
        info!(
            "Acquired a {} token that expires at {}",
            token.token_type(),
            token.expires_at().to_rfc3339()
        );
        *cached = Some(token.clone());

        Ok(token)
    }

    /// Drop the cached credential so the next call requests a new one
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    #[cfg(test)]
    pub(crate) async fn set_cached(&self, token: Credential) {
        *self.cached.write().await = Some(token);
    }

    /// Perform the client-credentials grant
    async fn request_token(&self) -> Result<Credential> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("token_type", self.credentials.token_type.as_str()),
        ];

        let requested_at = Utc::now();
        let started = Instant::now();
        let sent = self
            .http_client
            .post(&self.credentials.auth_url)
            .form(&form)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                self.observer.on_request(&RequestSummary::failed(
                    Method::POST,
                    started.elapsed(),
                    self.credentials.auth_url.as_str(),
                ));
                return Err(Error::TokenRequest(e));
            }
        };

        let status = response.status();
        self.observer.on_request(&RequestSummary::new(
            Method::POST,
            status.as_u16(),
            started.elapsed(),
            response.url().as_str(),
        ));

        let body = response.text().await.map_err(Error::TokenRequest)?;
        if !status.is_success() {
            return Err(Error::auth(format!(
                "Token request failed with status {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::token_response(format!("{e}")))?;
        token.into_credential(requested_at, self.credentials.token_type.as_str())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credential(
        self,
        requested_at: chrono::DateTime<Utc>,
        default_type: &str,
    ) -> Result<Credential> {
        if self.access_token.is_empty() {
            return Err(Error::token_response("empty access_token"));
        }
        if self.expires_in <= 0 {
            return Err(Error::token_response(format!(
                "expires_in must be positive, got {}",
                self.expires_in
            )));
        }

        let token_type = self
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_type.to_string());
        let expires_at = chrono::Duration::try_seconds(self.expires_in)
            .and_then(|ttl| requested_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                Error::token_response(format!("expires_in out of range: {}", self.expires_in))
            })?;

        Ok(Credential::new(self.access_token, token_type, expires_at))
    }
}

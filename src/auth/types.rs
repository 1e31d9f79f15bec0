//! Auth types
//!
//! Client identity for the client-credentials grant and the credential it
//! yields. The raw access token stays inside this module; callers can only
//! attach it to a request.

use crate::types::TokenType;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use std::fmt;

/// OAuth2 client identity used for the client-credentials grant
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Full URL of the token endpoint, e.g. `https://lms.example.com/oauth2/access_token`
    pub auth_url: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Token type to request
    pub token_type: TokenType,
}

impl ClientCredentials {
    /// Create credentials requesting the default (`jwt`) token type
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
        }
    }

    /// Request a different token type
    #[must_use]
    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Access token with its expiry
///
/// Replaced wholesale on refresh, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub(crate) fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at,
        }
    }

    #[cfg(test)]
    pub(crate) fn expires_in(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        seconds: i64,
    ) -> Self {
        Self::new(
            access_token,
            token_type,
            Utc::now() + chrono::Duration::seconds(seconds),
        )
    }

    /// Scheme used in the `Authorization` header (`jwt`, `bearer`, or whatever
    /// the token endpoint returned)
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// When the token stops being valid
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the token is expired now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Attach `Authorization: <token_type> <token>` to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, self.authorization_value())
    }

    pub(crate) fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_credential_not_expired() {
        let token = Credential::expires_in("test", "jwt", 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_credential_expired() {
        let token = Credential::expires_in("test", "jwt", -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_credential_expired_exactly_at_expiry() {
        let expires_at = Utc::now();
        let token = Credential::new("test", "jwt", expires_at);
        assert!(token.is_expired_at(expires_at));
        assert!(!token.is_expired_at(expires_at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_credential_apply_sets_authorization_header() {
        let token = Credential::expires_in("abc", "jwt", 60);
        let req = reqwest::Client::new().get("https://example.com/api");
        let built = token.apply(req).build().unwrap();
        assert_eq!(built.headers().get("Authorization").unwrap(), "jwt abc");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = Credential::expires_in("super-secret-token", "bearer", 60);
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("bearer"));

        let creds = ClientCredentials::new("https://x/token", "id", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_client_credentials_token_type() {
        let creds = ClientCredentials::new("https://x/token", "id", "secret");
        assert_eq!(creds.token_type, TokenType::Jwt);
        let creds = creds.with_token_type(TokenType::Bearer);
        assert_eq!(creds.token_type, TokenType::Bearer);
    }
}

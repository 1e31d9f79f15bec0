//! Authenticated, retrying GET
//!
//! Composes the token manager, the retry executor and the reqwest transport
//! into the "fetch one page" operation the paginator drives.

use super::observer::{RequestObserver, RequestSummary};
use super::retry::{RetryBudget, RetryExecutor};
use crate::auth::TokenManager;
use crate::error::{Error, Result};
use crate::pagination::{PageResult, PaginationStrategy};
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Issues authenticated GET requests with retry
pub struct AuthenticatedFetcher {
    client: Client,
    tokens: TokenManager,
    retry: RetryExecutor,
    observer: Arc<dyn RequestObserver>,
}

impl AuthenticatedFetcher {
    /// Create a fetcher
    pub fn new(
        client: Client,
        tokens: TokenManager,
        retry: RetryExecutor,
        observer: Arc<dyn RequestObserver>,
    ) -> Self {
        Self {
            client,
            tokens,
            retry,
            observer,
        }
    }

    /// Get the token manager
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Get the retry executor
    pub fn retry_executor(&self) -> &RetryExecutor {
        &self.retry
    }

    /// GET `url` with optional query parameters, retrying per `budget`
    ///
    /// Returns the first 2xx response. A terminal non-2xx status surfaces as
    /// [`Error::HttpStatus`]; an exhausted window as [`Error::BudgetExceeded`].
    pub async fn fetch(
        &self,
        url: &str,
        params: Option<&[(String, String)]>,
        budget: &RetryBudget,
    ) -> Result<Response> {
        self.retry
            .execute(budget, move |_| self.send(url, params))
            .await
    }

    /// Fetch one page and extract its next-page locator
    ///
    /// The body is read inside the retried attempt, so a connection dropped
    /// mid-body is retried like any other transport failure.
    pub async fn fetch_page(
        &self,
        url: &str,
        params: Option<&[(String, String)]>,
        budget: &RetryBudget,
        strategy: &PaginationStrategy,
    ) -> Result<PageResult> {
        let page = self
            .retry
            .execute(budget, move |_| async move {
                let response = self.send(url, params).await?;
                PageResult::read(response).await
            })
            .await?;

        let next = strategy.next_locator(&page.body)?;
        debug!(
            "Fetched page from {} ({} bytes), next: {}",
            page.url,
            page.body.len(),
            next.as_deref().unwrap_or("<none>")
        );

        Ok(page.with_next(next))
    }

    /// One attempt: attach a valid credential, send, classify the status
    async fn send(&self, url: &str, params: Option<&[(String, String)]>) -> Result<Response> {
        let credential = self.tokens.ensure_valid_token().await?;

        let mut req = self.client.get(url);
        if let Some(params) = params {
            if !params.is_empty() {
                req = req.query(params);
            }
        }
        let req = credential.apply(req);

        let started = Instant::now();
        match req.send().await {
            Ok(response) => {
                let status = response.status();
                self.observer.on_request(&RequestSummary::new(
                    Method::GET,
                    status.as_u16(),
                    started.elapsed(),
                    response.url().as_str(),
                ));

                if status.is_success() {
                    return Ok(response);
                }

                let final_url = response.url().to_string();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<body unavailable: {e}>"));
                Err(Error::http_status(status.as_u16(), final_url, body))
            }
            Err(e) => {
                self.observer.on_request(&RequestSummary::failed(
                    Method::GET,
                    started.elapsed(),
                    e.url().map_or(url, reqwest::Url::as_str),
                ));
                Err(Error::Http(e))
            }
        }
    }
}

impl std::fmt::Debug for AuthenticatedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedFetcher")
            .field("tokens", &self.tokens)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

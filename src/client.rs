//! API client
//!
//! Caller-facing entry point: builds the token manager, retry executor and
//! fetcher from a [`ClientConfig`] and offers single-page and paginated GETs.

use crate::auth::TokenManager;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{
    AuthenticatedFetcher, RequestObserver, RetryBudget, RetryExecutor, TracingObserver,
};
use crate::pagination::{PageResult, PageStream, PaginationStrategy, Paginator};
use crate::types::QueryParams;
use reqwest::Client;
use std::sync::Arc;

/// Authenticated, retrying, paginated REST client
#[derive(Debug, Clone)]
pub struct ApiClient {
    fetcher: Arc<AuthenticatedFetcher>,
    default_budget: RetryBudget,
}

impl ApiClient {
    /// Create a client that logs requests through `tracing`
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Create a client reporting every HTTP attempt to `observer`
    pub fn with_observer(config: ClientConfig, observer: Arc<dyn RequestObserver>) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Http)?;

        let tokens =
            TokenManager::with_client(config.credentials(), client.clone(), Arc::clone(&observer));
        let retry = RetryExecutor::new(config.retry.backoff());
        let fetcher = AuthenticatedFetcher::new(client, tokens, retry, observer);

        Ok(Self {
            fetcher: Arc::new(fetcher),
            default_budget: config.retry.budget(),
        })
    }

    /// Get the token manager
    pub fn token_manager(&self) -> &TokenManager {
        self.fetcher.token_manager()
    }

    /// Get the underlying fetcher
    pub fn fetcher(&self) -> &AuthenticatedFetcher {
        &self.fetcher
    }

    /// Budget used when a call does not supply its own
    pub fn default_budget(&self) -> &RetryBudget {
        &self.default_budget
    }

    /// Paginator bound to `budget`
    pub fn paginator(&self, budget: RetryBudget) -> Paginator {
        Paginator::new(Arc::clone(&self.fetcher), budget)
    }

    /// Fetch the first page of a resource
    pub async fn get(&self, url: &str, params: QueryParams) -> Result<PageResult> {
        self.get_with_budget(url, params, self.default_budget.clone())
            .await
    }

    /// Fetch the first page of a resource with a custom retry budget
    pub async fn get_with_budget(
        &self,
        url: &str,
        params: QueryParams,
        budget: RetryBudget,
    ) -> Result<PageResult> {
        self.paginator(budget).fetch_single_page(url, params).await
    }

    /// Stream every page of a resource
    pub fn paginated_get(
        &self,
        url: &str,
        params: QueryParams,
        strategy: PaginationStrategy,
    ) -> PageStream {
        self.paginated_get_with_budget(url, params, strategy, self.default_budget.clone())
    }

    /// Stream every page of a resource with a custom retry budget
    pub fn paginated_get_with_budget(
        &self,
        url: &str,
        params: QueryParams,
        strategy: PaginationStrategy,
        budget: RetryBudget,
    ) -> PageStream {
        self.paginator(budget).fetch_pages(url, params, strategy)
    }
}

//! Paginator
//!
//! Drives repeated page fetches as a lazy stream.

use super::types::{PageResult, PaginationStrategy};
use crate::error::{Error, Result};
use crate::http::{AuthenticatedFetcher, RetryBudget};
use crate::types::QueryParams;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Lazy sequence of pages; ends after the last page or the first error
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult>> + Send>>;

/// Where the traversal goes next
enum Cursor {
    /// First page: the caller's URL and query parameters
    Start { url: String, params: QueryParams },
    /// Server-provided URL, used verbatim
    Next { url: String, page: usize },
    Done,
}

/// Fetches pages for one logical call, sharing one retry budget
#[derive(Debug, Clone)]
pub struct Paginator {
    fetcher: Arc<AuthenticatedFetcher>,
    budget: RetryBudget,
}

impl Paginator {
    /// Create a paginator
    pub fn new(fetcher: Arc<AuthenticatedFetcher>, budget: RetryBudget) -> Self {
        Self { fetcher, budget }
    }

    /// Get the retry budget
    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Stream every page of a resource
    ///
    /// The first request uses `url` and `params`. Later requests use the
    /// extracted locator as-is and drop `params`, since the server's next URL
    /// already carries the query string. Nothing is fetched until the stream
    /// is polled; calling this again starts a fresh traversal.
    pub fn fetch_pages(
        &self,
        url: impl Into<String>,
        params: QueryParams,
        strategy: PaginationStrategy,
    ) -> PageStream {
        let fetcher = Arc::clone(&self.fetcher);
        let budget = self.budget.clone();
        let start = Cursor::Start {
            url: url.into(),
            params,
        };

        let pages = stream::try_unfold(start, move |cursor| {
            let fetcher = Arc::clone(&fetcher);
            let budget = budget.clone();
            let strategy = strategy.clone();

            async move {
                let (page, number) = match cursor {
                    Cursor::Start { url, params } => {
                        let page = fetcher
                            .fetch_page(&url, Some(&params), &budget, &strategy)
                            .await?;
                        (page, 1)
                    }
                    Cursor::Next { url, page } => {
                        let fetched = fetcher.fetch_page(&url, None, &budget, &strategy).await?;
                        (fetched, page)
                    }
                    Cursor::Done => return Ok(None),
                };

                let next = match &page.next {
                    Some(url) => Cursor::Next {
                        url: url.clone(),
                        page: number + 1,
                    },
                    None => {
                        debug!("Pagination complete after {number} page(s)");
                        Cursor::Done
                    }
                };

                Ok::<_, Error>(Some((page, next)))
            }
        });

        Box::pin(pages)
    }

    /// Fetch only the first page, never following a locator
    pub async fn fetch_single_page(
        &self,
        url: impl Into<String>,
        params: QueryParams,
    ) -> Result<PageResult> {
        let mut pages = self.fetch_pages(url, params, PaginationStrategy::None);
        pages
            .next()
            .await
            .unwrap_or_else(|| Err(Error::Other("no page returned".to_string())))
    }
}

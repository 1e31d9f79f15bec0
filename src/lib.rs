// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # edx-api-client
//!
//! Authenticated, retrying, paginated client for Open edX style REST APIs.
//!
//! ## Features
//!
//! - **OAuth2 Client Credentials**: cached `jwt`/`bearer` token, refreshed on expiry
//! - **Retry with Backoff**: transport errors and selected statuses, bounded per page
//! - **Lazy Pagination**: follow a `next` field, a nested path, or a custom extractor
//! - **Request Logging**: one summary line per HTTP attempt
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use edx_api_client::{ApiClient, ClientConfig, PaginationStrategy, Result};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::new(
//!         "https://lms.example.com/oauth2/access_token",
//!         "client-id",
//!         "client-secret",
//!     );
//!     let client = ApiClient::new(config)?;
//!
//!     let mut pages = client.paginated_get(
//!         "https://lms.example.com/api/courses/v1/courses/",
//!         vec![("page_size".into(), "100".into())],
//!         PaginationStrategy::default(),
//!     );
//!     while let Some(page) = pages.next().await {
//!         let body = page?.json_value()?;
//!         // Process results
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         ApiClient                         │
//! │     get(url, params) → Page    paginated_get → Stream     │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                         ┌────┴──────┐
//!                         │ Paginator │  next locator per PaginationStrategy
//!                         └────┬──────┘
//!                  ┌───────────┴───────────┐
//!                  │  AuthenticatedFetcher │
//!                  └───┬───────────────┬───┘
//!            ┌─────────┴─────┐   ┌─────┴─────────┐
//!            │ TokenManager  │   │ RetryExecutor │
//!            │ client creds  │   │ backoff+budget│
//!            └───────────────┘   └───────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// OAuth2 client-credentials token management
pub mod auth;

/// Authenticated HTTP fetching with retry
pub mod http;

/// Pagination strategies and page streams
pub mod pagination;

/// Client configuration
pub mod config;

/// Caller-facing client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use auth::{ClientCredentials, Credential, TokenManager};
pub use client::ApiClient;
pub use config::{ClientConfig, RetryConfig};
pub use http::{
    AuthenticatedFetcher, BackoffPolicy, RequestObserver, RequestSummary, RetryBudget,
    RetryExecutor, TracingObserver,
};
pub use pagination::{PageResult, PageStream, PaginationStrategy, Paginator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Pagination module
//!
//! Supports: single page, top-level next field, dotted path, custom extractor
//!
//! # Overview
//!
//! A `Paginator` turns a resource URL into a lazy stream of `PageResult`s.
//! After each page, the `PaginationStrategy` extracts the next page URL from
//! the body; the stream ends the first time no URL is found.

mod paginator;
mod types;

pub use paginator::{PageStream, Paginator};
pub use types::{NextLocatorFn, PageResult, PaginationStrategy};

//! Pagination types
//!
//! A fetched page and the strategies for finding the next one.

use crate::error::{Error, Result};
use crate::types::{JsonValue, OptionStringExt};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Caller-supplied projection from a JSON page body to the next page URL
pub type NextLocatorFn = Arc<dyn Fn(&JsonValue) -> Option<String> + Send + Sync>;

/// How to find the next page URL in a response body
#[derive(Clone)]
pub enum PaginationStrategy {
    /// Single page; the body is never inspected
    None,

    /// Top-level field holding the absolute URL of the next page
    FieldName(String),

    /// Dotted path to the next page URL, e.g. `pagination.next`
    Path(String),

    /// Custom projection over the parsed body
    Extractor(NextLocatorFn),
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        Self::FieldName("next".to_string())
    }
}

impl PaginationStrategy {
    /// Follow a top-level field
    pub fn field(name: impl Into<String>) -> Self {
        Self::FieldName(name.into())
    }

    /// Follow a dotted path
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Follow whatever `f` returns
    pub fn extractor<F>(f: F) -> Self
    where
        F: Fn(&JsonValue) -> Option<String> + Send + Sync + 'static,
    {
        Self::Extractor(Arc::new(f))
    }

    /// Check if this strategy ever continues past the first page
    pub fn is_paginated(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Extract the next page URL from a raw body
    ///
    /// `None` means the traversal is complete. Absent, null and empty values
    /// all terminate. A body that is not JSON is an error unless the strategy
    /// is [`PaginationStrategy::None`].
    pub fn next_locator(&self, body: &[u8]) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::FieldName(name) => {
                let value: JsonValue = serde_json::from_slice(body)?;
                Ok(locator_from(value.get(name.as_str()), name))
            }
            Self::Path(path) => {
                let value: JsonValue = serde_json::from_slice(body)?;
                Ok(locator_from(lookup_path(&value, path), path))
            }
            Self::Extractor(f) => {
                let value: JsonValue = serde_json::from_slice(body)?;
                Ok(f(&value).none_if_empty())
            }
        }
    }
}

impl fmt::Debug for PaginationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::FieldName(name) => f.debug_tuple("FieldName").field(name).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Extractor(_) => f.write_str("Extractor(<fn>)"),
        }
    }
}

fn locator_from(value: Option<&JsonValue>, key: &str) -> Option<String> {
    match value {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(url)) => url.clone().none_if_empty(),
        Some(other) => {
            warn!("Ignoring non-string next page locator at '{key}': {other}");
            None
        }
    }
}

/// Walk a dotted path such as `$.pagination.next` or `pagination.next`
fn lookup_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            JsonValue::Object(map) => current = map.get(part)?,
            _ => return None,
        }
    }

    Some(current)
}

/// One successfully fetched page
#[derive(Debug, Clone)]
pub struct PageResult {
    /// HTTP status (always 2xx)
    pub status: u16,
    /// Final URL the page was fetched from
    pub url: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Bytes,
    /// URL of the following page, `None` on the last page
    pub next: Option<String>,
}

impl PageResult {
    /// Read a response into a page with no locator yet
    pub(crate) async fn read(response: Response) -> Result<Self> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::Http)?;

        Ok(Self {
            status,
            url,
            headers,
            body,
            next: None,
        })
    }

    pub(crate) fn with_next(mut self, next: Option<String>) -> Self {
        self.next = next;
        self
    }

    /// Check if this is the last page of the traversal
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parse the body as a JSON value
    pub fn json_value(&self) -> Result<JsonValue> {
        self.json()
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

//! Book catalog search against the Open Library search API.
//!
//! Responses are normalised into a fixed-shape [`SearchResult`] list, capped at
//! [`MAX_RESULTS`] entries in the order the catalog ranked them.

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Default Open Library search endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://openlibrary.org/search.json";

/// Default cover image pattern, `{id}` is replaced by the numeric cover id
pub const DEFAULT_COVER_PATTERN: &str = "https://covers.openlibrary.org/b/id/{id}-M.jpg";

/// Maximum number of results kept from a search response
pub const MAX_RESULTS: usize = 10;

/// Author shown when the catalog has none
pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
}

/// One entry of a normalised search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub author: String,
    /// Numeric cover image id, if the work has a cover
    pub cover_id: Option<i64>,
    /// Opaque catalog key such as `/works/OL123W`
    pub key: String,
}

impl SearchResult {
    /// Cover image URL built from `pattern`, `None` renders a placeholder
    pub fn cover_url(&self, pattern: &str) -> Option<String> {
        self.cover_id.map(|id| cover_url(pattern, id))
    }
}

/// Raw document as returned by the catalog; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<Vec<String>>,
    #[serde(default)]
    pub cover_i: Option<i64>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<CatalogDoc>,
}

/// Build a cover URL from a pattern containing `{id}`
pub fn cover_url(pattern: &str, id: i64) -> String {
    pattern.replace("{id}", &id.to_string())
}

/// Keep the first [`MAX_RESULTS`] docs and fill in defaults.
pub fn normalize_docs(docs: Vec<CatalogDoc>) -> Vec<SearchResult> {
    docs.into_iter()
        .take(MAX_RESULTS)
        .map(|doc| SearchResult {
            title: doc.title.unwrap_or_default(),
            author: doc
                .author_name
                .and_then(|names| names.into_iter().next())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            // a zero id is treated as "no cover"
            cover_id: doc.cover_i.filter(|id| *id != 0),
            key: doc.key.unwrap_or_default(),
        })
        .collect()
}

/// A searchable book catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search for `query`, returning at most [`MAX_RESULTS`] entries
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CatalogError>;
}

/// Open Library implementation of [`Catalog`].
pub struct OpenLibrary {
    client: Client,
    search_url: String,
}

impl OpenLibrary {
    pub fn new(client: Client, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    /// `GET {search_url}?q=<query>`
    fn search_request(&self, query: &str) -> reqwest::Result<Request> {
        self.client
            .get(&self.search_url)
            .query(&[("q", query)])
            .build()
    }
}

#[async_trait]
impl Catalog for OpenLibrary {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CatalogError> {
        debug!(query, url = %self.search_url, "catalog search");

        let request = self.search_request(query)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "catalog search rejected");
            return Err(CatalogError::Status(status));
        }

        let body: SearchResponse = response.json().await?;
        debug!(docs = body.docs.len(), "catalog search returned");
        Ok(normalize_docs(body.docs))
    }
}

//! The summariser client: catalog search, summarisation and retry wired to a
//! [`Store`].
//!
//! Each operation is split into a synchronous `start_*` step that updates the
//! store and returns a job, and an async job that performs the network round
//! trip and yields the [`Action`] to apply. The `async` convenience methods run
//! both halves in sequence; the TUI spawns jobs and applies their actions as
//! they arrive.

use crate::backend::{HttpBackend, SummaryBackend, Upload};
use crate::catalog::{Catalog, OpenLibrary};
use crate::config::Config;
use crate::http::create_client;
use crate::language::Language;
use crate::state::{Action, Outcome, RequestId, RequestOrigin, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A pending catalog search.
#[derive(Debug)]
pub struct SearchJob {
    id: RequestId,
    query: String,
}

impl SearchJob {
    pub async fn run(self, catalog: &dyn Catalog) -> Action {
        let result = catalog
            .search(&self.query)
            .await
            .map_err(|e| e.to_string());
        Action::SearchFinished {
            id: self.id,
            result,
        }
    }
}

/// A pending summarisation request.
#[derive(Debug)]
pub struct SummaryJob {
    id: RequestId,
    origin: RequestOrigin,
    language: Language,
}

impl SummaryJob {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn origin(&self) -> &RequestOrigin {
        &self.origin
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub async fn run(self, backend: &dyn SummaryBackend) -> Action {
        let result = match &self.origin {
            RequestOrigin::Book(key) => backend.summarize_book(key, self.language).await,
            RequestOrigin::Upload(path) => match Upload::from_path(path).await {
                Ok(upload) => backend.summarize_upload(upload, self.language).await,
                Err(e) => Err(e),
            },
        };
        let outcome = match result {
            Ok(response) => Outcome::Response(response),
            Err(e) => Outcome::Transport(e.to_string()),
        };
        Action::SummaryFinished {
            id: self.id,
            outcome,
        }
    }
}

pub struct SummarizerClient {
    catalog: Arc<dyn Catalog>,
    backend: Arc<dyn SummaryBackend>,
    store: Store,
}

impl SummarizerClient {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        backend: Arc<dyn SummaryBackend>,
        language: Language,
    ) -> Self {
        Self {
            catalog,
            backend,
            store: Store::new(language),
        }
    }

    /// Build a client talking to Open Library and the configured backend
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = create_client(config.http.timeout())?;
        let catalog = OpenLibrary::new(http.clone(), config.catalog.search_url.clone());
        let backend = HttpBackend::new(http, config.backend.url.clone());
        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(backend),
            config.session.language,
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn backend(&self) -> Arc<dyn SummaryBackend> {
        Arc::clone(&self.backend)
    }

    pub fn set_language(&mut self, language: Language) {
        self.store.dispatch(Action::SetLanguage(language));
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.store.dispatch(Action::SetQuery(query.into()));
    }

    /// Apply a completed job's action
    pub fn apply(&mut self, action: Action) {
        self.store.dispatch(action);
    }

    /// Start a search; blank queries are ignored and return `None`
    pub fn start_search(&mut self, query: &str) -> Option<SearchJob> {
        if query.trim().is_empty() {
            return None;
        }
        self.set_query(query);
        let id = self.store.begin_search();
        debug!(id, query, "search started");
        Some(SearchJob {
            id,
            query: query.to_string(),
        })
    }

    pub fn start_book(&mut self, book_key: impl Into<String>) -> SummaryJob {
        self.start_summary(RequestOrigin::Book(book_key.into()))
    }

    pub fn start_upload(&mut self, path: impl Into<PathBuf>) -> SummaryJob {
        self.start_summary(RequestOrigin::Upload(path.into()))
    }

    /// Re-issue the last catalog-key request with the current language
    pub fn start_retry(&mut self) -> Option<SummaryJob> {
        if !self.store.retry_available() {
            return None;
        }
        let key = self.store.last_book_key()?.to_string();
        info!(book_key = %key, language = %self.store.language(), "retrying summary");
        Some(self.start_book(key))
    }

    fn start_summary(&mut self, origin: RequestOrigin) -> SummaryJob {
        let language = self.store.language();
        let id = self.store.begin_summary(origin.clone());
        debug!(id, ?origin, %language, "summary started");
        SummaryJob {
            id,
            origin,
            language,
        }
    }

    /// Search and apply the result; returns whether a request was issued
    pub async fn search(&mut self, query: &str) -> bool {
        let Some(job) = self.start_search(query) else {
            return false;
        };
        let catalog = self.catalog();
        let action = job.run(catalog.as_ref()).await;
        self.apply(action);
        true
    }

    pub async fn summarize_book(&mut self, book_key: &str) {
        let job = self.start_book(book_key);
        self.finish(job).await;
    }

    pub async fn summarize_upload(&mut self, path: impl Into<PathBuf>) {
        let job = self.start_upload(path);
        self.finish(job).await;
    }

    /// Retry the last failed catalog-key request; returns whether one was issued
    pub async fn retry(&mut self) -> bool {
        let Some(job) = self.start_retry() else {
            return false;
        };
        self.finish(job).await;
        true
    }

    async fn finish(&mut self, job: SummaryJob) {
        let backend = self.backend();
        let action = job.run(backend.as_ref()).await;
        self.apply(action);
    }
}

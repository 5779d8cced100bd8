//! Presentation state as a reducer.
//!
//! All UI state lives in one [`Store`] and only changes through
//! [`Store::dispatch`]. A summarisation attempt moves through
//! [`SummaryPhase`]: `Idle -> Loading -> {Loaded, Failed}`, and any new request
//! (or a retry) moves it back to `Loading`.
//!
//! Every asynchronous operation is tagged with a monotonically increasing
//! [`RequestId`]. Completions carrying an id older than the latest request are
//! discarded, so a slow response can never overwrite a newer one.

use crate::backend::SummaryResponse;
use crate::catalog::SearchResult;
use crate::language::Language;
use crate::media::{AudioClip, AudioHandle, AUDIO_MIME};
use std::path::PathBuf;
use tracing::{debug, warn};

pub type RequestId = u64;

pub const SEARCH_FAILED: &str = "Failed to search books. Please try again.";
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary received.";
pub const NO_SUMMARY_ERROR: &str = "No summary provided by the backend.";
pub const AUDIO_FAILED: &str =
    "Audio generation failed. Check backend logs or ElevenLabs API key.";
pub const BOOK_FAILED_PLACEHOLDER: &str = "Error summarizing book. Is backend running?";
pub const FILE_FAILED_PLACEHOLDER: &str = "Failed to summarize file. Check backend.";

/// What a summarisation request was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Catalog key such as `/works/OL123W`
    Book(String),
    /// Uploaded document
    Upload(PathBuf),
}

/// Result of a summarisation round trip as seen by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(SummaryResponse),
    /// Network error, non-2xx status or unreadable upload
    Transport(String),
}

/// Which part of the UI an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Search,
    /// Transport failure while summarising by catalog key
    SummarizeBook,
    /// Transport failure while summarising an upload
    SummarizeFile,
    MissingSummary,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    pub domain: ErrorDomain,
    pub message: String,
}

/// A completed summarisation with independent text and audio results.
#[derive(Debug)]
pub struct Loaded {
    pub origin: RequestOrigin,
    pub summary: String,
    pub audio: Option<AudioHandle>,
}

#[derive(Debug, Default)]
pub enum SummaryPhase {
    #[default]
    Idle,
    Loading {
        id: RequestId,
        origin: RequestOrigin,
    },
    Loaded(Loaded),
    Failed {
        origin: RequestOrigin,
        /// Placeholder shown in the summary pane
        summary: String,
    },
}

#[derive(Debug, Default)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub in_flight: Option<RequestId>,
}

#[derive(Debug)]
pub enum Action {
    SetLanguage(Language),
    SetQuery(String),
    SearchStarted {
        id: RequestId,
    },
    SearchFinished {
        id: RequestId,
        result: Result<Vec<SearchResult>, String>,
    },
    SummaryStarted {
        id: RequestId,
        origin: RequestOrigin,
    },
    SummaryFinished {
        id: RequestId,
        outcome: Outcome,
    },
}

/// Single source of truth for the presentation.
#[derive(Debug, Default)]
pub struct Store {
    language: Language,
    search: SearchState,
    phase: SummaryPhase,
    errors: Vec<UiError>,
    last_book_key: Option<String>,
    last_search_id: RequestId,
    last_summary_id: RequestId,
}

impl Store {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }

    /// Allocate an id and mark a search as started
    pub fn begin_search(&mut self) -> RequestId {
        let id = self.last_search_id + 1;
        self.dispatch(Action::SearchStarted { id });
        id
    }

    /// Allocate an id and move the summary phase to `Loading`
    pub fn begin_summary(&mut self, origin: RequestOrigin) -> RequestId {
        let id = self.last_summary_id + 1;
        self.dispatch(Action::SummaryStarted { id, origin });
        id
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::SetLanguage(language) => self.language = language,
            Action::SetQuery(query) => self.search.query = query,
            Action::SearchStarted { id } => {
                if id <= self.last_search_id {
                    return;
                }
                self.last_search_id = id;
                self.search.in_flight = Some(id);
                self.clear_errors(|d| d == ErrorDomain::Search);
            }
            Action::SearchFinished { id, result } => {
                if id != self.last_search_id {
                    debug!(id, latest = self.last_search_id, "discarding stale search result");
                    return;
                }
                self.search.in_flight = None;
                match result {
                    Ok(results) => self.search.results = results,
                    Err(detail) => {
                        warn!(%detail, "search failed");
                        self.search.results.clear();
                        self.push_error(ErrorDomain::Search, SEARCH_FAILED.to_string());
                    }
                }
            }
            Action::SummaryStarted { id, origin } => {
                if id <= self.last_summary_id {
                    return;
                }
                self.last_summary_id = id;
                if let RequestOrigin::Book(key) = &origin {
                    self.last_book_key = Some(key.clone());
                }
                self.clear_errors(|d| d != ErrorDomain::Search);
                // replacing the phase drops any previous audio handle
                self.phase = SummaryPhase::Loading { id, origin };
            }
            Action::SummaryFinished { id, outcome } => {
                let origin = match &self.phase {
                    SummaryPhase::Loading { id: current, origin } if *current == id => {
                        origin.clone()
                    }
                    _ => {
                        debug!(id, latest = self.last_summary_id, "discarding stale summary result");
                        return;
                    }
                };
                self.phase = match outcome {
                    Outcome::Response(response) => self.apply_response(origin, response),
                    Outcome::Transport(detail) => self.apply_transport_failure(origin, detail),
                };
            }
        }
    }

    fn apply_response(&mut self, origin: RequestOrigin, response: SummaryResponse) -> SummaryPhase {
        let summary = match response.summary.filter(|s| !s.is_empty()) {
            Some(summary) => summary,
            None => {
                self.push_error(ErrorDomain::MissingSummary, NO_SUMMARY_ERROR.to_string());
                NO_SUMMARY_PLACEHOLDER.to_string()
            }
        };

        let audio = match response.audio.filter(|a| !a.is_empty()) {
            Some(encoded) => match AudioClip::from_base64(&encoded, AUDIO_MIME)
                .and_then(AudioHandle::create)
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "audio payload unusable");
                    self.push_error(ErrorDomain::Audio, format!("Audio could not be decoded: {e}"));
                    None
                }
            },
            None => {
                self.push_error(ErrorDomain::Audio, AUDIO_FAILED.to_string());
                None
            }
        };

        SummaryPhase::Loaded(Loaded {
            origin,
            summary,
            audio,
        })
    }

    fn apply_transport_failure(&mut self, origin: RequestOrigin, detail: String) -> SummaryPhase {
        warn!(?origin, %detail, "summarise request failed");
        let (domain, message, summary) = match &origin {
            RequestOrigin::Book(_) => (
                ErrorDomain::SummarizeBook,
                format!("Failed to summarize book: {detail}. Try again or check backend."),
                BOOK_FAILED_PLACEHOLDER,
            ),
            RequestOrigin::Upload(_) => (
                ErrorDomain::SummarizeFile,
                format!("Failed to summarize file: {detail}"),
                FILE_FAILED_PLACEHOLDER,
            ),
        };
        self.push_error(domain, message);
        SummaryPhase::Failed {
            origin,
            summary: summary.to_string(),
        }
    }

    fn push_error(&mut self, domain: ErrorDomain, message: String) {
        self.errors.push(UiError { domain, message });
    }

    fn clear_errors(&mut self, pred: impl Fn(ErrorDomain) -> bool) {
        self.errors.retain(|e| !pred(e.domain));
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn phase(&self) -> &SummaryPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SummaryPhase::Loading { .. })
    }

    pub fn is_searching(&self) -> bool {
        self.search.in_flight.is_some()
    }

    /// Text for the summary pane, including failure placeholders
    pub fn summary_text(&self) -> Option<&str> {
        match &self.phase {
            SummaryPhase::Loaded(loaded) => Some(&loaded.summary),
            SummaryPhase::Failed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioHandle> {
        match &self.phase {
            SummaryPhase::Loaded(loaded) => loaded.audio.as_ref(),
            _ => None,
        }
    }

    /// Every current error, oldest first
    pub fn errors(&self) -> &[UiError] {
        &self.errors
    }

    /// The most recently raised error, as shown in the single error banner
    pub fn visible_error(&self) -> Option<&UiError> {
        self.errors.last()
    }

    pub fn last_book_key(&self) -> Option<&str> {
        self.last_book_key.as_deref()
    }

    /// Retry is offered only while the shown error is a failed catalog-key request
    pub fn retry_available(&self) -> bool {
        !self.is_loading()
            && self.last_book_key.is_some()
            && self.visible_error().map(|e| e.domain) == Some(ErrorDomain::SummarizeBook)
    }
}

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tomecast::backend::{BackendError, SummaryBackend, SummaryResponse, Upload};
use tomecast::catalog::{normalize_docs, Catalog, CatalogDoc, CatalogError, SearchResult};
use tomecast::state::{ErrorDomain, SummaryPhase, SEARCH_FAILED};
use tomecast::{export, Language, SummarizerClient};

struct FakeCatalog {
    docs: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeCatalog {
    fn with_docs(docs: usize) -> Self {
        Self {
            docs,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            docs: 0,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::Status(StatusCode::BAD_GATEWAY));
        }
        let docs = (0..self.docs)
            .map(|i| CatalogDoc {
                title: Some(format!("{query} {i}")),
                author_name: Some(vec![format!("Author {i}"), "Second".into()]),
                cover_i: (i % 2 == 0).then_some(1000 + i as i64),
                key: Some(format!("/works/OL{i}W")),
            })
            .collect();
        Ok(normalize_docs(docs))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Book(String, Language),
    Upload(String, Vec<u8>, Language),
}

#[derive(Default)]
struct FakeBackend {
    responses: Mutex<VecDeque<Result<SummaryResponse, BackendError>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    fn replying(responses: Vec<Result<SummaryResponse, BackendError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::default(),
        }
    }

    fn next(&self) -> Result<SummaryResponse, BackendError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SummaryResponse::default()))
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryBackend for FakeBackend {
    async fn summarize_book(
        &self,
        book_key: &str,
        language: Language,
    ) -> Result<SummaryResponse, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Book(book_key.to_string(), language));
        self.next()
    }

    async fn summarize_upload(
        &self,
        upload: Upload,
        language: Language,
    ) -> Result<SummaryResponse, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Upload(upload.file_name, upload.bytes, language));
        self.next()
    }
}

fn ok(summary: Option<&str>, audio: Option<&str>) -> Result<SummaryResponse, BackendError> {
    Ok(SummaryResponse {
        summary: summary.map(str::to_string),
        audio: audio.map(str::to_string),
    })
}

fn client(catalog: Arc<FakeCatalog>, backend: Arc<FakeBackend>) -> SummarizerClient {
    SummarizerClient::new(catalog, backend, Language::En)
}

#[tokio::test]
async fn search_keeps_ten_results_in_order() {
    let catalog = Arc::new(FakeCatalog::with_docs(15));
    let mut client = client(catalog.clone(), Arc::default());

    assert!(client.search("Dune").await);

    let results = &client.store().search().results;
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].title, "Dune 0");
    assert_eq!(results[9].title, "Dune 9");
    assert_eq!(results[3].author, "Author 3");
    assert_eq!(results[1].cover_id, None);
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_query_is_a_no_op() {
    let catalog = Arc::new(FakeCatalog::with_docs(3));
    let mut client = client(catalog.clone(), Arc::default());
    client.search("Dune").await;

    assert!(!client.search("").await);
    assert!(!client.search("   \t").await);

    assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.store().search().query, "Dune");
    assert_eq!(client.store().search().results.len(), 3);
}

#[tokio::test]
async fn failed_search_clears_results() {
    let mut client = client(Arc::new(FakeCatalog::failing()), Arc::default());
    client.search("Dune").await;
    assert!(client.store().search().results.is_empty());
    let error = client.store().visible_error().unwrap();
    assert_eq!(error.domain, ErrorDomain::Search);
    assert_eq!(error.message, SEARCH_FAILED);
}

#[tokio::test]
async fn loading_toggles_around_a_rejected_request() {
    let backend = Arc::new(FakeBackend::replying(vec![Err(BackendError::Status(
        StatusCode::INTERNAL_SERVER_ERROR,
    ))]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend.clone());

    let job = client.start_book("/works/OL1W");
    assert!(client.store().is_loading());
    let action = job.run(backend.as_ref()).await;
    assert!(client.store().is_loading());
    client.apply(action);
    assert!(!client.store().is_loading());
    assert!(matches!(client.store().phase(), SummaryPhase::Failed { .. }));
}

#[tokio::test]
async fn dune_scenario() {
    let backend = Arc::new(FakeBackend::replying(vec![ok(
        Some("A desert planet."),
        Some("SGVsbG8="),
    )]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(15)), backend.clone());

    client.search("Dune").await;
    assert_eq!(client.store().search().results.len(), 10);

    client.summarize_book("/works/OL123W").await;
    let store = client.store();
    assert_eq!(store.summary_text(), Some("A desert planet."));
    assert!(store.visible_error().is_none());
    let handle = store.audio().expect("audio handle");
    assert_eq!(handle.clip().mime(), "audio/mpeg");
    assert!(handle.path().exists());

    let dir = tempfile::tempdir().unwrap();
    let saved = export::save_audio(dir.path(), handle.clip()).unwrap();
    assert_eq!(saved.file_name().unwrap(), "summary.mp3");
    assert_eq!(std::fs::read(saved).unwrap(), b"Hello");

    assert_eq!(
        backend.calls(),
        [Call::Book("/works/OL123W".into(), Language::En)]
    );
}

#[tokio::test]
async fn summary_without_audio_reports_audio_failure() {
    let backend = Arc::new(FakeBackend::replying(vec![ok(Some("s"), None)]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend);
    client.summarize_book("/works/OL1W").await;

    let store = client.store();
    assert_eq!(store.summary_text(), Some("s"));
    assert!(store.audio().is_none());
    assert_eq!(store.visible_error().unwrap().domain, ErrorDomain::Audio);
    assert!(!store.retry_available());
}

#[tokio::test]
async fn retry_uses_current_language() {
    let backend = Arc::new(FakeBackend::replying(vec![
        Err(BackendError::Status(StatusCode::SERVICE_UNAVAILABLE)),
        ok(Some("Résumé"), Some("SGVsbG8=")),
    ]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend.clone());

    assert!(!client.retry().await);

    client.summarize_book("/works/OL7W").await;
    assert!(client.store().retry_available());
    assert!(client
        .store()
        .visible_error()
        .unwrap()
        .message
        .contains("summarize book"));

    client.set_language(Language::Fr);
    assert!(client.retry().await);

    assert_eq!(client.store().summary_text(), Some("Résumé"));
    assert!(!client.store().retry_available());
    assert_eq!(
        backend.calls(),
        [
            Call::Book("/works/OL7W".into(), Language::En),
            Call::Book("/works/OL7W".into(), Language::Fr),
        ]
    );
}

#[tokio::test]
async fn upload_sends_file_contents_and_language() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(file, "It was a dark and stormy night.").unwrap();

    let backend = Arc::new(FakeBackend::replying(vec![ok(Some("Stormy."), Some("SGVsbG8="))]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend.clone());
    client.set_language(Language::Af);
    client.summarize_upload(file.path()).await;

    assert_eq!(client.store().summary_text(), Some("Stormy."));
    assert_eq!(client.store().last_book_key(), None);
    match &backend.calls()[..] {
        [Call::Upload(name, bytes, Language::Af)] => {
            assert!(name.ends_with(".txt"));
            assert_eq!(bytes, b"It was a dark and stormy night.");
        }
        other => panic!("unexpected calls: {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_upload_fails_without_calling_backend() {
    let backend = Arc::new(FakeBackend::default());
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend.clone());
    client.summarize_upload("/nonexistent/book.pdf").await;

    let store = client.store();
    assert!(!store.is_loading());
    assert_eq!(store.visible_error().unwrap().domain, ErrorDomain::SummarizeFile);
    assert!(!store.retry_available());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn late_response_from_older_request_is_ignored() {
    let backend = Arc::new(FakeBackend::replying(vec![
        ok(Some("first"), None),
        ok(Some("second"), Some("SGVsbG8=")),
    ]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend.clone());

    let first = client.start_book("/works/OL1W");
    let second = client.start_book("/works/OL2W");
    let first_action = first.run(backend.as_ref()).await;
    let second_action = second.run(backend.as_ref()).await;

    client.apply(second_action);
    client.apply(first_action);

    assert_eq!(client.store().summary_text(), Some("second"));
    assert!(client.store().audio().is_some());
}

#[tokio::test]
async fn new_request_releases_previous_audio_file() {
    let backend = Arc::new(FakeBackend::replying(vec![
        ok(Some("one"), Some("SGVsbG8=")),
        ok(Some("two"), Some("SGVsbG8=")),
    ]));
    let mut client = client(Arc::new(FakeCatalog::with_docs(0)), backend);

    client.summarize_book("/works/OL1W").await;
    let first_path = client.store().audio().unwrap().path().to_path_buf();
    assert!(first_path.exists());

    client.summarize_book("/works/OL2W").await;
    assert!(!first_path.exists());
    let second_path = client.store().audio().unwrap().path().to_path_buf();

    drop(client);
    assert!(!second_path.exists());
}

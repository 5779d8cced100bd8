//! Summarisation backend client.
//!
//! The backend accepts either a catalog key (form-encoded) or an uploaded
//! document (multipart) plus a language code, and answers with a JSON body
//! carrying an optional `summary` and an optional base64 `audio` payload.

use crate::language::Language;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Request, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Default backend base address
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// File extensions accepted for upload
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file type: {0} (expected .pdf or .txt)")]
    UnsupportedFile(String),
}

/// Response body of both summarise endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub summary: Option<String>,
    /// Base64-encoded MP3
    #[serde(default)]
    pub audio: Option<String>,
}

/// A document selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload from in-memory bytes, deriving the MIME type from the name
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, BackendError> {
        let file_name = file_name.into();
        let mime = mime_for(&file_name)?;
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    /// Read a `.pdf` or `.txt` document from disk
    pub async fn from_path(path: &Path) -> Result<Self, BackendError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        // check the extension before touching the file
        mime_for(&file_name)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| BackendError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::new(file_name, bytes)
    }
}

fn mime_for(file_name: &str) -> Result<&'static str, BackendError> {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok("application/pdf"),
        "txt" => Ok("text/plain"),
        _ => Err(BackendError::UnsupportedFile(file_name.to_string())),
    }
}

/// Something that can turn a book or a document into a summary.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    async fn summarize_book(
        &self,
        book_key: &str,
        language: Language,
    ) -> Result<SummaryResponse, BackendError>;

    async fn summarize_upload(
        &self,
        upload: Upload,
        language: Language,
    ) -> Result<SummaryResponse, BackendError>;
}

/// HTTP implementation talking to the summariser service.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `POST {base}/summarize_book` with form fields `book_key` and `language`
    fn book_request(&self, book_key: &str, language: Language) -> reqwest::Result<Request> {
        self.client
            .post(self.endpoint("summarize_book"))
            .form(&[("book_key", book_key), ("language", language.code())])
            .build()
    }

    /// `POST {base}/summarize` with multipart parts `file` and `language`
    fn upload_request(&self, upload: Upload, language: Language) -> reqwest::Result<Request> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("language", language.code());
        self.client
            .post(self.endpoint("summarize"))
            .multipart(form)
            .build()
    }

    async fn execute(&self, request: Request) -> Result<SummaryResponse, BackendError> {
        let response = self.client.execute(request).await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<SummaryResponse, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "backend rejected summarise request");
            return Err(BackendError::Status(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SummaryBackend for HttpBackend {
    async fn summarize_book(
        &self,
        book_key: &str,
        language: Language,
    ) -> Result<SummaryResponse, BackendError> {
        debug!(book_key, %language, "summarise book");
        let request = self.book_request(book_key, language)?;
        self.execute(request).await
    }

    async fn summarize_upload(
        &self,
        upload: Upload,
        language: Language,
    ) -> Result<SummaryResponse, BackendError> {
        debug!(file = %upload.file_name, size = upload.bytes.len(), %language, "summarise upload");
        let request = self.upload_request(upload, language)?;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn response_fields_are_optional() {
        let empty: SummaryResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SummaryResponse::default());

        let nulls: SummaryResponse =
            serde_json::from_str(r#"{"summary": "s", "audio": null}"#).unwrap();
        assert_eq!(nulls.summary.as_deref(), Some("s"));
        assert_eq!(nulls.audio, None);
    }

    #[test]
    fn upload_mime_follows_extension() {
        assert_eq!(Upload::new("a.PDF", vec![]).unwrap().mime, "application/pdf");
        assert_eq!(Upload::new("notes.txt", vec![]).unwrap().mime, "text/plain");
        assert!(matches!(
            Upload::new("song.mp3", vec![]),
            Err(BackendError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let backend = HttpBackend::new(Client::new(), "http://localhost:8000/");
        assert_eq!(
            backend.endpoint("summarize_book"),
            "http://localhost:8000/summarize_book"
        );
    }

    #[test]
    fn book_request_is_form_encoded() {
        let backend = HttpBackend::new(Client::new(), "http://localhost:8000");
        let request = backend.book_request("/works/OL123W", Language::Fr).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:8000/summarize_book");
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(&b"book_key=%2Fworks%2FOL123W&language=fr"[..])
        );
    }

    #[test]
    fn upload_request_is_multipart() {
        let backend = HttpBackend::new(Client::new(), "http://localhost:8000");
        let upload = Upload::new("notes.txt", b"text".to_vec()).unwrap();
        let request = backend.upload_request(upload, Language::Zu).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:8000/summarize");
        let content_type = request.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn upload_reads_file_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "chapter one").unwrap();
        let upload = Upload::from_path(file.path()).await.unwrap();
        assert_eq!(upload.bytes, b"chapter one");
        assert_eq!(upload.mime, "text/plain");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = Upload::from_path(Path::new("/nonexistent/book.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Read { .. }));
    }
}

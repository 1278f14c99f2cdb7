//! Document text extraction.
//!
//! Two backends:
//!
//! * [`HttpExtractor`] — multipart upload to an extraction service that
//!   answers `{"content": "<text>"}`. Handles both PDF and DOCX.
//! * [`PdfiumExtractor`] — in-process PDF text extraction via pdfium. pdfium
//!   is not async-safe, so the work runs in `spawn_blocking`. DOCX is
//!   reported as unsupported.

use crate::acquire::{Document, DocumentKind};
use crate::error::{ServiceError, StudioError};
use crate::services::Extractor;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest error body kept from a failing service response.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct ParseFileResponse {
    content: String,
}

/// Extraction through an HTTP service.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    timeout_secs: u64,
}

impl HttpExtractor {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, StudioError> {
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| {
            StudioError::InvalidConfig(format!("Invalid extraction endpoint '{endpoint}': {e}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StudioError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, document: &Document) -> Result<String, ServiceError> {
        info!("Uploading '{}' to {}", document.name, self.endpoint);

        let part = Part::bytes(document.bytes.clone())
            .file_name(document.name.clone())
            .mime_str(document.kind.mime_type())
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Extraction service answered HTTP {}", status);
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let parsed: ParseFileResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        debug!(
            "Extracted {} chars from '{}'",
            parsed.content.chars().count(),
            document.name
        );
        Ok(parsed.content)
    }
}

/// Local PDF extraction through pdfium.
///
/// Binds to the library at `PDFIUM_LIB_PATH` when set, otherwise to the
/// system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

#[async_trait]
impl Extractor for PdfiumExtractor {
    async fn extract(&self, document: &Document) -> Result<String, ServiceError> {
        if document.kind == DocumentKind::Docx {
            return Err(ServiceError::Unsupported(
                "DOCX extraction requires the HTTP extraction service".into(),
            ));
        }
        check_pdf_magic(&document.bytes)?;

        let bytes = document.bytes.clone();
        let library = self.library_path.clone();
        tokio::task::spawn_blocking(move || extract_pdf_blocking(&bytes, library.as_deref()))
            .await
            .map_err(|e| ServiceError::Unavailable(format!("Extraction task panicked: {e}")))?
    }
}

/// Verify the `%PDF` magic bytes so pdfium never sees arbitrary input.
fn check_pdf_magic(bytes: &[u8]) -> Result<(), ServiceError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ServiceError::InvalidResponse(format!(
            "not a PDF document, first bytes: {magic:?}"
        )));
    }
    Ok(())
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, ServiceError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path.to_string_lossy().to_string()),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ServiceError::Unavailable(format!("Failed to bind to pdfium: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of PDF text extraction.
fn extract_pdf_blocking(bytes: &[u8], library: Option<&Path>) -> Result<String, ServiceError> {
    let pdfium = bind_pdfium(library)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ServiceError::InvalidResponse(format!("PDF is unreadable: {e:?}")))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| {
            ServiceError::InvalidResponse(format!("page {}: {e:?}", idx + 1))
        })?;
        pages.push(text.all());
    }
    info!("Extracted text from {} PDF pages", pages.len());

    Ok(pages.join("\n\n"))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max_chars).collect();
        t.push('\u{2026}');
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_extractor_rejects_bad_endpoint() {
        let err = HttpExtractor::new("not a url", 10).unwrap_err();
        assert!(err.to_string().contains("Invalid extraction endpoint"));
    }

    #[test]
    fn http_extractor_accepts_default_endpoint() {
        let ex = HttpExtractor::new(crate::config::DEFAULT_EXTRACT_ENDPOINT, 10).unwrap();
        assert_eq!(ex.endpoint(), "http://localhost:3000/api/parse-file");
    }

    #[test]
    fn pdf_magic_is_checked() {
        assert!(check_pdf_magic(b"%PDF-1.7\n...").is_ok());
        assert!(check_pdf_magic(b"PK\x03\x04").is_err());
        assert!(check_pdf_magic(b"").is_err());
    }

    #[tokio::test]
    async fn pdfium_extractor_refuses_docx() {
        let ex = PdfiumExtractor::default();
        let doc = Document {
            name: "essay.docx".into(),
            kind: DocumentKind::Docx,
            bytes: b"PK\x03\x04".to_vec(),
        };
        let err = ex.extract(&doc).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unsupported(_)));
    }

    #[tokio::test]
    async fn pdfium_extractor_refuses_non_pdf_bytes() {
        let ex = PdfiumExtractor::default();
        let doc = Document {
            name: "fake.pdf".into(),
            kind: DocumentKind::Pdf,
            bytes: b"hello".to_vec(),
        };
        let err = ex.extract(&doc).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc\u{2026}");
    }
}

//! External collaborators of a card studio.
//!
//! The session core only talks to three capabilities, each behind a trait so
//! that UIs, tests, and alternative backends can swap implementations:
//!
//! ```text
//! Extractor ──▶ (source text) ──▶ CardGenerator ──▶ (cards) ──▶ Rasterizer
//! PDF/DOCX        session          LLM              gallery      headless Chrome
//! ```
//!
//! 1. [`Extractor`]     — document bytes to plain text ([`extract`])
//! 2. [`CardGenerator`] — source text to an ordered batch of cards ([`llm`],
//!    with response clean-up in [`response`])
//! 3. [`Rasterizer`]    — a full HTML page to PNG bytes ([`chrome`]); blocking
//!    engines run in `spawn_blocking`
//!
//! Implementations report [`ServiceError`]; the studio converts it into the
//! component error of whichever step made the call.

pub mod chrome;
pub mod extract;
pub mod llm;
pub mod response;

use crate::acquire::Document;
use crate::config::CanvasSpec;
use crate::error::ServiceError;
use crate::gallery::GeneratedCard;
use async_trait::async_trait;

pub use chrome::ChromeRasterizer;
pub use extract::{HttpExtractor, PdfiumExtractor};
pub use llm::LlmCardGenerator;

/// Turns a PDF or DOCX document into plain text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, document: &Document) -> Result<String, ServiceError>;
}

/// Produces an ordered batch of cards from source text.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn generate(&self, source: &str) -> Result<Vec<GeneratedCard>, ServiceError>;
}

/// Renders a complete HTML page into PNG bytes.
///
/// The returned bitmap should be `canvas.pixel_width() × canvas.pixel_height()`;
/// the exporter normalises anything else. Any temporary resource the
/// implementation creates must be released before it returns, whatever the
/// outcome.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, page: &str, canvas: &CanvasSpec) -> Result<Vec<u8>, ServiceError>;
}

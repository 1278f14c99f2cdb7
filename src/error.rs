//! Error types for the text2card library.
//!
//! Each component owns its own error enum, and every collaborator failure is
//! converted into one of them at the boundary of the component that made the
//! call:
//!
//! * [`AcquireError`] — loading source text from a file failed.
//! * [`GenerationError`] — the card generator failed or returned nothing.
//! * [`GalleryError`] — an index did not resolve to a card. UI wiring errors,
//!   never surfaced as user notices.
//! * [`ExportError`] — nothing to export, or rasterisation failed.
//!
//! Collaborators themselves speak [`ServiceError`], which never travels past
//! the component that invoked them. [`StudioError`] is the only fatal kind and
//! is returned while constructing a [`crate::Studio`], never during a session.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while acquiring source text from a file.
///
/// The session's prior source text is left untouched for every variant.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The declared media type is not plain text, PDF, or DOCX.
    #[error("Unsupported file format '{media_type}' for '{name}'\nUpload a TXT, DOCX or PDF file.")]
    UnsupportedFormat { name: String, media_type: String },

    /// The file could not be read, or its contents were not valid UTF-8.
    #[error("Failed to read '{name}': {detail}")]
    ReadFailed { name: String, detail: String },

    /// The extraction service could not turn the document into text.
    #[error("Failed to extract text from '{name}': {source}")]
    ParseFailed {
        name: String,
        #[source]
        source: ServiceError,
    },
}

/// Failure of a generation round. The session returns to its pre-generation
/// phase and keeps its previous cards.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The generation service failed (network, API, timeout, bad response).
    #[error("Card generation failed: {source}")]
    ServiceFailed {
        #[source]
        source: ServiceError,
    },

    /// The service answered successfully but produced no cards.
    #[error("Card generation returned no cards")]
    EmptyResult,
}

/// Index-based navigation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("Card index {index} is out of range (gallery holds {len} cards)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The gallery is empty")]
    Empty,
}

/// Failure of an export round. The export trigger is restored either way.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No card has been generated yet.
    #[error("There is no card to export")]
    NothingToExport,

    /// Rendering the card to a bitmap failed.
    #[error("Rasterisation failed for card {ordinal}: {detail}")]
    RasterizationFailed { ordinal: usize, detail: String },
}

/// Failure reported by an external collaborator (extractor, generator,
/// rasteriser).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The request never got an answer (connection refused, DNS, TLS, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The call exceeded its timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The answer arrived but could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The collaborator does not handle this kind of input.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A required local engine (browser, pdfium) is missing or crashed.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Fatal errors raised while building a studio or its collaborators.
#[derive(Debug, Error)]
pub enum StudioError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not build the HTTP client for the extraction service.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Could not write an exported image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = AcquireError::UnsupportedFormat {
            name: "photo.png".into(),
            media_type: "image/png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image/png"), "got: {msg}");
        assert!(msg.contains("photo.png"), "got: {msg}");
    }

    #[test]
    fn parse_failed_keeps_source() {
        let e = AcquireError::ParseFailed {
            name: "report.pdf".into(),
            source: ServiceError::Status {
                status: 500,
                body: "boom".into(),
            },
        };
        assert!(e.to_string().contains("HTTP 500"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn gallery_out_of_range_display() {
        let e = GalleryError::IndexOutOfRange { index: 5, len: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3 cards"));
    }

    #[test]
    fn rasterization_failed_display() {
        let e = ExportError::RasterizationFailed {
            ordinal: 2,
            detail: "chrome exited".into(),
        };
        assert!(e.to_string().contains("card 2"));
        assert!(e.to_string().contains("chrome exited"));
    }

    #[test]
    fn timeout_display() {
        let e = ServiceError::Timeout { secs: 120 };
        assert_eq!(e.to_string(), "timed out after 120s");
    }
}

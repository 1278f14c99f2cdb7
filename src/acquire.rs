//! Input acquisition: turn a typed string or an uploaded file into source text.
//!
//! Files are dispatched on their declared media type:
//!
//! | Media type | Handling |
//! |---|---|
//! | `text/plain` | read as UTF-8 |
//! | `application/pdf` | bytes sent to the [`Extractor`] |
//! | DOCX (`application/vnd.openxmlformats-officedocument.wordprocessingml.document`) | bytes sent to the [`Extractor`] |
//! | anything else | rejected as unsupported |
//!
//! Nothing here touches the session; the studio writes the resulting text
//! only when acquisition succeeded, so a failure can never partially
//! overwrite the previous source.

use crate::error::AcquireError;
use crate::services::Extractor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// Declared type for files whose extension is not recognised.
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// Document formats that need an extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => MIME_PDF,
            DocumentKind::Docx => MIME_DOCX,
        }
    }
}

/// How a declared media type is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    PlainText,
    Document(DocumentKind),
    Unsupported,
}

impl MediaClass {
    /// Classify a declared media type. Parameters such as `; charset=utf-8`
    /// are ignored.
    pub fn of(media_type: &str) -> MediaClass {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_TEXT => MediaClass::PlainText,
            MIME_PDF => MediaClass::Document(DocumentKind::Pdf),
            MIME_DOCX => MediaClass::Document(DocumentKind::Docx),
            _ => MediaClass::Unsupported,
        }
    }
}

/// Guess a media type from a file extension, the way a browser would fill
/// in a file input's declared type. Unknown extensions fall back to
/// [`MIME_UNKNOWN`].
pub fn guess_media_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Where a file's contents live.
#[derive(Debug, Clone)]
pub enum FileData {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One user-selected file plus its declared media type.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    media_type: String,
    data: FileData,
}

impl SourceFile {
    /// A file on disk, media type guessed from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = guess_media_type(&path);
        Self::with_media_type(path, media_type)
    }

    /// A file on disk with an explicitly declared media type.
    pub fn with_media_type(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            media_type: media_type.into(),
            data: FileData::Path(path),
        }
    }

    /// An in-memory upload.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: FileData::Bytes(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, AcquireError> {
        match &self.data {
            FileData::Bytes(b) => Ok(b.clone()),
            FileData::Path(p) => tokio::fs::read(p).await.map_err(|e| AcquireError::ReadFailed {
                name: self.name.clone(),
                detail: e.to_string(),
            }),
        }
    }
}

/// A document handed to an [`Extractor`].
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

/// Canonical form of source text: surrounding whitespace removed.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_string()
}

/// Read `file` into canonical source text.
///
/// Unsupported types are rejected before any I/O happens.
pub async fn read_source(
    file: &SourceFile,
    extractor: &dyn Extractor,
) -> Result<String, AcquireError> {
    match MediaClass::of(&file.media_type) {
        MediaClass::Unsupported => {
            warn!("Rejected '{}': unsupported type {}", file.name, file.media_type);
            Err(AcquireError::UnsupportedFormat {
                name: file.name.clone(),
                media_type: file.media_type.clone(),
            })
        }
        MediaClass::PlainText => {
            let bytes = file.read_bytes().await?;
            let text = String::from_utf8(bytes).map_err(|e| AcquireError::ReadFailed {
                name: file.name.clone(),
                detail: format!("not valid UTF-8: {e}"),
            })?;
            debug!("Read {} chars of plain text from '{}'", text.chars().count(), file.name);
            Ok(normalize_text(&text))
        }
        MediaClass::Document(kind) => {
            let bytes = file.read_bytes().await?;
            info!("Extracting text from '{}' ({} bytes)", file.name, bytes.len());
            let document = Document {
                name: file.name.clone(),
                kind,
                bytes,
            };
            let text = extractor
                .extract(&document)
                .await
                .map_err(|source| AcquireError::ParseFailed {
                    name: file.name.clone(),
                    source,
                })?;
            Ok(normalize_text(&text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_media_types() {
        assert_eq!(MediaClass::of("text/plain"), MediaClass::PlainText);
        assert_eq!(
            MediaClass::of("text/plain; charset=utf-8"),
            MediaClass::PlainText
        );
        assert_eq!(
            MediaClass::of("Application/PDF"),
            MediaClass::Document(DocumentKind::Pdf)
        );
        assert_eq!(
            MediaClass::of(MIME_DOCX),
            MediaClass::Document(DocumentKind::Docx)
        );
        assert_eq!(MediaClass::of("application/msword"), MediaClass::Unsupported);
        assert_eq!(MediaClass::of("image/png"), MediaClass::Unsupported);
        assert_eq!(MediaClass::of(""), MediaClass::Unsupported);
    }

    #[test]
    fn guess_from_extension() {
        assert_eq!(guess_media_type(Path::new("notes.TXT")), MIME_TEXT);
        assert_eq!(guess_media_type(Path::new("/tmp/paper.pdf")), MIME_PDF);
        assert_eq!(guess_media_type(Path::new("essay.docx")), MIME_DOCX);
        assert_eq!(guess_media_type(Path::new("essay.doc")), "application/msword");
        assert_eq!(guess_media_type(Path::new("README")), MIME_UNKNOWN);
        assert_eq!(guess_media_type(Path::new("card.png")), "image/png");
    }

    #[test]
    fn guessed_types_classify_as_expected() {
        let class = |name: &str| MediaClass::of(&guess_media_type(Path::new(name)));
        assert_eq!(class("notes.txt"), MediaClass::PlainText);
        assert_eq!(class("paper.PDF"), MediaClass::Document(DocumentKind::Pdf));
        assert_eq!(class("essay.docx"), MediaClass::Document(DocumentKind::Docx));
        assert_eq!(class("essay.doc"), MediaClass::Unsupported);
        assert_eq!(class("archive"), MediaClass::Unsupported);
    }

    #[test]
    fn source_file_name_from_path() {
        let f = SourceFile::from_path("/data/in/summary.txt");
        assert_eq!(f.name(), "summary.txt");
        assert_eq!(f.media_type(), MIME_TEXT);
    }

    #[test]
    fn normalize_trims() {
        assert_eq!(normalize_text("  \n hello world \t\n"), "hello world");
    }
}

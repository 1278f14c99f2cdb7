//! Export: rasterise a card at the target resolution and package it as PNG.
//!
//! The selected card's markup is wrapped in a page document pinned to the
//! canvas size, handed to the [`Rasterizer`], and the returned bitmap is
//! normalised to exactly `canvas.pixel_width() × canvas.pixel_height()`
//! before being re-encoded. PNG keeps the transparent background intact.

use crate::config::CanvasSpec;
use crate::error::{ExportError, StudioError};
use crate::gallery::CardArtifact;
use crate::services::Rasterizer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage};
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A rasterised card ready for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl ExportedImage {
    /// `data:image/png;base64,…` URL, as used for browser download links.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Write the image into `dir` under its file name.
    ///
    /// Uses atomic write (temp file + rename) so a reader never sees a
    /// partial PNG.
    pub async fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf, StudioError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.file_name);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StudioError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        let tmp_path = path.with_extension("png.tmp");
        tokio::fs::write(&tmp_path, &self.png)
            .await
            .map_err(|e| StudioError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StudioError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("Saved {}", path.display());
        Ok(path)
    }
}

/// Export file name: `<label>_<ordinal>.png`, ordinal 1-based.
pub fn export_file_name(label: &str, ordinal: usize) -> String {
    format!("{}_{}.png", label.trim(), ordinal)
}

/// Wrap card markup in a page pinned to the canvas size.
pub fn page_document(markup: &str, canvas: &CanvasSpec) -> String {
    let background = if canvas.transparent {
        "transparent"
    } else {
        "#ffffff"
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
html, body {{ margin: 0; padding: 0; background: {background}; }}
#card {{ width: {w}px; height: {h}px; overflow: hidden; }}
#card > * {{ box-sizing: border-box; width: {w}px; height: {h}px; }}
</style>
</head>
<body>
<div id="card">{markup}</div>
</body>
</html>
"#,
        w = canvas.width,
        h = canvas.height,
    )
}

/// Decode a rasteriser's output and re-encode it at exactly the target size.
///
/// A bitmap of the wrong size (a rasteriser that ignored the scale factor,
/// say) is resampled rather than rejected.
pub fn normalise_png(bytes: &[u8], canvas: &CanvasSpec) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = (canvas.pixel_width(), canvas.pixel_height());

    let img = if img.width() == w && img.height() == h {
        img
    } else {
        warn!(
            "Rasteriser produced {}×{}, resampling to {}×{}",
            img.width(),
            img.height(),
            w,
            h
        );
        img.resize_exact(w, h, FilterType::Lanczos3)
    };

    let img = DynamicImage::ImageRgba8(img.into_rgba8());
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded card → {} bytes PNG", buf.len());
    Ok(buf)
}

/// Rasterises cards through a [`Rasterizer`].
#[derive(Clone)]
pub struct Exporter {
    rasterizer: Arc<dyn Rasterizer>,
    canvas: CanvasSpec,
    label: String,
}

impl Exporter {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, canvas: CanvasSpec, label: impl Into<String>) -> Self {
        Self {
            rasterizer,
            canvas,
            label: label.into(),
        }
    }

    pub fn canvas(&self) -> &CanvasSpec {
        &self.canvas
    }

    /// Rasterise one card.
    pub async fn export(&self, card: &CardArtifact) -> Result<ExportedImage, ExportError> {
        let ordinal = card.ordinal();
        let page = page_document(card.markup(), &self.canvas);

        let raw = self
            .rasterizer
            .rasterize(&page, &self.canvas)
            .await
            .map_err(|e| ExportError::RasterizationFailed {
                ordinal,
                detail: e.to_string(),
            })?;

        let png = normalise_png(&raw, &self.canvas).map_err(|e| {
            ExportError::RasterizationFailed {
                ordinal,
                detail: format!("Image encoding failed: {e}"),
            }
        })?;

        Ok(ExportedImage {
            file_name: export_file_name(&self.label, ordinal),
            width: self.canvas.pixel_width(),
            height: self.canvas.pixel_height(),
            png,
        })
    }
}

//! Off-screen rasterisation through headless Chrome.
//!
//! `headless_chrome` drives the browser over a blocking DevTools connection,
//! so each capture runs inside `tokio::task::spawn_blocking`.
//!
//! Every capture owns three temporary resources: the scratch HTML file, the
//! browser process, and its tab. All three are plain RAII values scoped to
//! [`capture_blocking`], so they are released on success, on any `?` early
//! return, and on panic.

use crate::config::CanvasSpec;
use crate::error::ServiceError;
use crate::services::Rasterizer;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::protocol::cdp::{Emulation, DOM};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// [`Rasterizer`] that screenshots the page in a fresh headless Chrome.
#[derive(Debug, Clone)]
pub struct ChromeRasterizer {
    chrome_path: Option<PathBuf>,
    timeout: Duration,
}

impl Default for ChromeRasterizer {
    fn default() -> Self {
        Self {
            chrome_path: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ChromeRasterizer {
    /// Use the Chrome/Chromium binary found on the system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chrome/Chromium binary.
    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    /// Navigation and DevTools timeout per capture. Default: 30 s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Rasterizer for ChromeRasterizer {
    async fn rasterize(&self, page: &str, canvas: &CanvasSpec) -> Result<Vec<u8>, ServiceError> {
        let page = page.to_string();
        let canvas = *canvas;
        let chrome_path = self.chrome_path.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || capture_blocking(&page, &canvas, chrome_path, timeout))
            .await
            .map_err(|e| ServiceError::Unavailable(format!("Capture task panicked: {e}")))?
    }
}

/// Closes the tab when dropped. Declared after the browser so it drops first.
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(false) {
            debug!("Closing capture tab failed: {}", e);
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Unavailable(e.to_string())
}

/// Blocking implementation of a single capture.
fn capture_blocking(
    page: &str,
    canvas: &CanvasSpec,
    chrome_path: Option<PathBuf>,
    timeout: Duration,
) -> Result<Vec<u8>, ServiceError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("text2card-")
        .suffix(".html")
        .tempfile()
        .map_err(unavailable)?;
    scratch.write_all(page.as_bytes()).map_err(unavailable)?;
    scratch.flush().map_err(unavailable)?;
    let url = reqwest::Url::from_file_path(scratch.path())
        .map_err(|_| unavailable(format!("bad scratch path {}", scratch.path().display())))?;

    let options = LaunchOptions::default_builder()
        .headless(true)
        .path(chrome_path)
        .window_size(Some((canvas.width, canvas.height)))
        .idle_browser_timeout(timeout)
        .build()
        .map_err(unavailable)?;
    let browser = Browser::new(options).map_err(unavailable)?;
    let tab = TabGuard(browser.new_tab().map_err(unavailable)?);
    tab.0.set_default_timeout(timeout);

    if canvas.transparent {
        tab.0
            .call_method(Emulation::SetDefaultBackgroundColorOverride {
                color: Some(DOM::RGBA {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: Some(0.0),
                }),
            })
            .map_err(capture_failed)?;
    }

    tab.0
        .navigate_to(url.as_str())
        .and_then(|t| t.wait_until_navigated())
        .map_err(capture_failed)?;

    let clip = Viewport {
        x: 0.0,
        y: 0.0,
        width: f64::from(canvas.width),
        height: f64::from(canvas.height),
        scale: f64::from(canvas.scale),
    };
    let png = tab
        .0
        .capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
        .map_err(capture_failed)?;

    info!(
        "Captured {}×{} @{}x → {} bytes",
        canvas.width,
        canvas.height,
        canvas.scale,
        png.len()
    );
    Ok(png)
}

fn capture_failed(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::InvalidResponse(format!("capture failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_settings() {
        let r = ChromeRasterizer::new()
            .with_chrome_path("/usr/bin/chromium")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(r.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(r.timeout, Duration::from_secs(5));
    }
}

//! Configuration types for a card studio session.
//!
//! Everything tunable lives in [`StudioConfig`], built via
//! [`StudioConfigBuilder`]. The generation parameters (temperature, output
//! size) are configuration constants; callers of [`crate::Studio::generate`]
//! never pass them per call.

use crate::error::StudioError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default endpoint of the document extraction service.
pub const DEFAULT_EXTRACT_ENDPOINT: &str = "http://localhost:3000/api/parse-file";

/// Largest accepted canvas side, in logical pixels.
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Largest accepted retry count for generation calls.
pub const MAX_RETRIES: u32 = 10;

/// Configuration for a [`crate::Studio`].
///
/// # Example
/// ```rust
/// use text2card::StudioConfig;
///
/// let config = StudioConfig::builder()
///     .min_source_chars(20)
///     .temperature(0.5)
///     .export_label("summary")
///     .build()
///     .unwrap();
/// assert_eq!(config.canvas.pixel_width(), 2160);
/// ```
#[derive(Clone)]
pub struct StudioConfig {
    /// Minimum number of characters (after trimming) before generation is
    /// allowed. Default: 10.
    pub min_source_chars: usize,

    /// Off-screen canvas used for export. Default: 1080×800 at 2×, transparent.
    pub canvas: CanvasSpec,

    /// Visual styles requested from the generator, one card per style.
    /// Default: minimal, dark, colorful.
    pub card_styles: Vec<CardStyle>,

    /// Sampling temperature for card generation. Default: 0.7.
    ///
    /// Cards are a design task rather than a transcription, so the default
    /// sits well above what an extraction prompt would use.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per round. Default: 2000.
    pub max_tokens: usize,

    /// Retries on a failed generation call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call LLM timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom system prompt. If None, uses [`crate::prompts::CARD_DESIGNER_PROMPT`].
    pub system_prompt: Option<String>,

    /// Where PDF and DOCX documents are sent for text extraction.
    pub extraction: ExtractionBackend,

    /// Timeout for one extraction request, in seconds. Default: 60.
    pub extract_timeout_secs: u64,

    /// Filename prefix of exported images (`<label>_<ordinal>.png`).
    /// Default: "concept-card".
    pub export_label: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            min_source_chars: 10,
            canvas: CanvasSpec::default(),
            card_styles: CardStyle::defaults(),
            temperature: 0.7,
            max_tokens: 2000,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            model: None,
            provider_name: None,
            provider: None,
            system_prompt: None,
            extraction: ExtractionBackend::default(),
            extract_timeout_secs: 60,
            export_label: "concept-card".to_string(),
        }
    }
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfig")
            .field("min_source_chars", &self.min_source_chars)
            .field("canvas", &self.canvas)
            .field("card_styles", &self.card_styles)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("extraction", &self.extraction)
            .field("export_label", &self.export_label)
            .finish()
    }
}

impl StudioConfig {
    /// Create a new builder for `StudioConfig`.
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StudioConfig`].
#[derive(Debug)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn min_source_chars(mut self, n: usize) -> Self {
        self.config.min_source_chars = n;
        self
    }

    pub fn canvas(mut self, canvas: CanvasSpec) -> Self {
        self.config.canvas = canvas;
        self
    }

    pub fn card_styles(mut self, styles: Vec<CardStyle>) -> Self {
        self.config.card_styles = styles;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn extraction(mut self, backend: ExtractionBackend) -> Self {
        self.config.extraction = backend;
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    pub fn export_label(mut self, label: impl Into<String>) -> Self {
        self.config.export_label = label.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudioConfig, StudioError> {
        let c = &self.config;
        if c.min_source_chars == 0 {
            return Err(StudioError::InvalidConfig(
                "Minimum source length must be ≥ 1".into(),
            ));
        }
        if c.canvas.width == 0 || c.canvas.height == 0 {
            return Err(StudioError::InvalidConfig(format!(
                "Canvas must be non-empty, got {}×{}",
                c.canvas.width, c.canvas.height
            )));
        }
        if c.canvas.width > MAX_CANVAS_SIDE || c.canvas.height > MAX_CANVAS_SIDE {
            return Err(StudioError::InvalidConfig(format!(
                "Canvas sides must be at most {MAX_CANVAS_SIDE}px, got {}×{}",
                c.canvas.width, c.canvas.height
            )));
        }
        if !(1..=4).contains(&c.canvas.scale) {
            return Err(StudioError::InvalidConfig(format!(
                "Canvas scale must be 1–4, got {}",
                c.canvas.scale
            )));
        }
        if c.card_styles.is_empty() {
            return Err(StudioError::InvalidConfig(
                "At least one card style is required".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(StudioError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES}, got {}",
                c.max_retries
            )));
        }
        if c.max_tokens == 0 {
            return Err(StudioError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        let label = c.export_label.trim();
        if label.is_empty() || label.contains(['/', '\\']) {
            return Err(StudioError::InvalidConfig(format!(
                "Export label must be a plain file-name prefix, got {:?}",
                c.export_label
            )));
        }
        Ok(self.config)
    }
}

// ── Canvas ───────────────────────────────────────────────────────────────

/// Off-screen canvas a card is rasterised on.
///
/// `width`/`height` are logical (CSS) pixels; the bitmap is `scale` times
/// larger in each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    /// Keep the page background transparent instead of white.
    pub transparent: bool,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 800,
            scale: 2,
            transparent: true,
        }
    }
}

impl CanvasSpec {
    /// Width of the produced bitmap in pixels. Saturates for canvases that
    /// bypassed builder validation.
    pub fn pixel_width(&self) -> u32 {
        self.width.saturating_mul(self.scale)
    }

    /// Height of the produced bitmap in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height.saturating_mul(self.scale)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Visual style of one generated card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStyle {
    /// Light background, restrained palette.
    Minimal,
    /// Dark background, light text.
    Dark,
    /// Gradient background, saturated accents.
    Colorful,
    /// Free-form description passed to the generator verbatim.
    Custom(String),
}

impl CardStyle {
    /// The three styles produced per round unless configured otherwise.
    pub fn defaults() -> Vec<CardStyle> {
        vec![CardStyle::Minimal, CardStyle::Dark, CardStyle::Colorful]
    }

    /// Short identifier used in the generation request and on artifacts.
    pub fn key(&self) -> &str {
        match self {
            CardStyle::Minimal => "minimal",
            CardStyle::Dark => "dark",
            CardStyle::Colorful => "colorful",
            CardStyle::Custom(s) => s,
        }
    }

    /// One-line design brief for the generator.
    pub fn brief(&self) -> String {
        match self {
            CardStyle::Minimal => {
                "minimal: white background, dark text, one accent colour".to_string()
            }
            CardStyle::Dark => {
                "dark: near-black background, white text, luminous accents".to_string()
            }
            CardStyle::Colorful => {
                "colorful: blue-to-purple gradient background, white text".to_string()
            }
            CardStyle::Custom(s) => s.clone(),
        }
    }

    /// Parse a style name as accepted on the command line.
    pub fn parse(s: &str) -> CardStyle {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "simple" => CardStyle::Minimal,
            "dark" => CardStyle::Dark,
            "colorful" | "colourful" | "color" => CardStyle::Colorful,
            _ => CardStyle::Custom(s.trim().to_string()),
        }
    }
}

/// How PDF and DOCX documents are turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionBackend {
    /// Multipart upload to an extraction service returning `{"content": …}`.
    Http { endpoint: String },
    /// In-process PDF extraction through pdfium. DOCX is not supported.
    Local,
}

impl Default for ExtractionBackend {
    fn default() -> Self {
        ExtractionBackend::Http {
            endpoint: DEFAULT_EXTRACT_ENDPOINT.to_string(),
        }
    }
}

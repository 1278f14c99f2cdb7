//! # text2card
//!
//! Turn a piece of text (typed, or pulled from a `.txt`, `.pdf` or `.docx`
//! file) into a small gallery of visual concept cards, and export the chosen
//! card as a high-resolution PNG.
//!
//! ## Flow
//!
//! ```text
//! text / file
//!  │
//!  ├─ 1. Acquire   plain text read directly, documents via an extractor
//!  ├─ 2. Generate  one LLM call → a batch of HTML cards (one per style)
//!  ├─ 3. Preview   gallery with a single active card
//!  └─ 4. Export    headless Chrome → PNG at canvas × scale, transparent bg
//! ```
//!
//! Everything runs through a [`Studio`], which owns the session state and
//! guards it with a small phase machine: while a generation or an export is
//! in flight, further triggers are turned away instead of queued.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use text2card::{Studio, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let studio = Studio::from_config(StudioConfig::default())?;
//!     studio.set_direct_text("Rust's ownership model prevents data races at compile time.");
//!
//!     if let Some(count) = studio.generate().await?.done() {
//!         eprintln!("{count} cards");
//!         studio.select(count - 1)?;
//!         if let Some(image) = studio.export_current().await?.done() {
//!             image.save_in(".").await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `text2card` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! text2card = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod acquire;
pub mod config;
pub mod error;
pub mod export;
pub mod gallery;
pub mod observer;
pub mod prompts;
pub mod services;
pub mod session;
pub mod studio;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use acquire::{DocumentKind, MediaClass, SourceFile};
pub use config::{CanvasSpec, CardStyle, ExtractionBackend, StudioConfig, StudioConfigBuilder};
pub use error::{
    AcquireError, ExportError, GalleryError, GenerationError, ServiceError, StudioError,
};
pub use export::{ExportedImage, Exporter};
pub use gallery::{CardArtifact, Gallery, GeneratedCard};
pub use observer::{NoopObserver, Notice, NoticeKind, SessionObserver, SharedObserver};
pub use services::{CardGenerator, Extractor, Rasterizer};
pub use session::{Outcome, Phase, Rejection, SessionSnapshot, TriggerState};
pub use studio::Studio;

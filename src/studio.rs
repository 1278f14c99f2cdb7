//! The studio: one session plus the collaborators that act on it.
//!
//! Every user action is a method on [`Studio`] taking `&self`, so a UI can
//! issue a new action while an earlier one is still suspended on a
//! collaborator. The session sits behind a mutex that is only held for the
//! synchronous bookkeeping around each suspension point, never across an
//! `.await`. Re-entrancy is handled by the phase machine instead:
//!
//! ```text
//!              set text (≥ min)             generate()
//!   Idle ───────────────────────▶ Ready ───────────────▶ Generating
//!     ▲    set text (< min)         │                      │  │
//!     └─────────────────────────────┘          ok (≥1 card) │  │ error / empty
//!                                                          ▼  ▼
//!            export_current()                   Previewing   back to the
//!   Exporting ◀──────────────── Previewing ◀──┘            settled phase
//!       └──── done / error ─────────▲
//! ```
//!
//! While `Generating` or `Exporting`, both `generate()` and `export_current()`
//! are turned away with [`Outcome::Rejected`]. The busy phase is held by a
//! guard and released on every exit path, including a panic in a
//! collaborator or the caller dropping the future.

use crate::acquire::{self, normalize_text, SourceFile};
use crate::config::{ExtractionBackend, StudioConfig};
use crate::error::{AcquireError, ExportError, GalleryError, GenerationError, StudioError};
use crate::export::{ExportedImage, Exporter};
use crate::gallery::CardArtifact;
use crate::observer::{NoopObserver, Notice, SharedObserver};
use crate::services::{
    CardGenerator, ChromeRasterizer, Extractor, HttpExtractor, LlmCardGenerator, PdfiumExtractor,
    Rasterizer,
};
use crate::session::{Outcome, Phase, Rejection, Session, SessionSnapshot, TriggerState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Coordinates acquisition, generation, navigation and export for one
/// session.
pub struct Studio {
    config: StudioConfig,
    session: Mutex<Session>,
    extractor: Arc<dyn Extractor>,
    generator: Arc<dyn CardGenerator>,
    exporter: Exporter,
    observer: SharedObserver,
}

impl Studio {
    /// Build a studio around explicit collaborators.
    pub fn new(
        config: StudioConfig,
        extractor: Arc<dyn Extractor>,
        generator: Arc<dyn CardGenerator>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        let exporter = Exporter::new(rasterizer, config.canvas, config.export_label.clone());
        Self {
            config,
            session: Mutex::new(Session::default()),
            extractor,
            generator,
            exporter,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build a studio with the stock collaborators: the configured extraction
    /// backend, an LLM generator, and headless Chrome for rasterisation.
    pub fn from_config(config: StudioConfig) -> Result<Self, StudioError> {
        let extractor: Arc<dyn Extractor> = match &config.extraction {
            ExtractionBackend::Http { endpoint } => {
                Arc::new(HttpExtractor::new(endpoint, config.extract_timeout_secs)?)
            }
            ExtractionBackend::Local => Arc::new(PdfiumExtractor::new()),
        };
        let generator = Arc::new(LlmCardGenerator::from_config(&config)?);
        let rasterizer = Arc::new(ChromeRasterizer::new());
        Ok(Self::new(config, extractor, generator, rasterizer))
    }

    /// Attach an observer for session events.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    // ── Read-only views ─────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot(self.config.min_source_chars)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn triggers(&self) -> TriggerState {
        self.lock().triggers(self.config.min_source_chars)
    }

    pub fn source_text(&self) -> String {
        self.lock().source_text().to_string()
    }

    /// The current batch, in order.
    pub fn cards(&self) -> Vec<CardArtifact> {
        self.lock().gallery().cards().to_vec()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.lock().gallery().selected_index()
    }

    /// Active-marker flags, one per card.
    pub fn markers(&self) -> Vec<bool> {
        self.lock().gallery().markers()
    }

    // ── Input acquisition ───────────────────────────────────────────────

    /// Replace the source text with typed input (trimmed).
    pub fn set_direct_text(&self, text: &str) {
        let min = self.config.min_source_chars;
        let text = normalize_text(text);
        let chars = self.update(|s| {
            s.set_source_text(text);
            s.settle(min);
            s.source_chars()
        });
        self.observer.on_source_changed(chars);
    }

    /// Replace the source text with the contents of a file.
    ///
    /// On any error the previous source text is kept. Readiness is
    /// re-published either way.
    pub async fn set_from_file(&self, file: &SourceFile) -> Result<(), AcquireError> {
        let min = self.config.min_source_chars;
        let result = acquire::read_source(file, self.extractor.as_ref()).await;

        let outcome = match result {
            Ok(text) => {
                let chars = self.update(|s| {
                    s.set_source_text(text);
                    s.settle(min);
                    s.source_chars()
                });
                info!("Loaded {} chars from '{}'", chars, file.name());
                self.observer.on_source_changed(chars);
                self.observer.on_file_loaded(file.name(), chars);
                Ok(())
            }
            Err(e) => {
                warn!("Acquisition failed: {}", e);
                self.observer.on_notice(&Notice::from(&e));
                Err(e)
            }
        };

        let triggers = self.triggers();
        self.observer.on_triggers_changed(&triggers);
        outcome
    }

    // ── Generation ──────────────────────────────────────────────────────

    /// Generate a fresh batch of cards from the current source text.
    ///
    /// Returns `Ok(Outcome::Done(n))` with the batch size on success and
    /// `Ok(Outcome::Rejected(_))` when the text is too short or another
    /// operation is in flight; in that case nothing is called and nothing
    /// changes.
    pub async fn generate(&self) -> Result<Outcome<usize>, GenerationError> {
        let min = self.config.min_source_chars;
        let gate = self.update(|s| {
            if s.phase().is_busy() {
                return Err(Rejection::Busy { phase: s.phase() });
            }
            let chars = s.source_chars();
            if chars < min {
                return Err(Rejection::SourceTooShort { chars, min });
            }
            s.set_phase(Phase::Generating);
            Ok(s.source_text().to_string())
        });
        let source = match gate {
            Ok(source) => source,
            Err(rejection) => {
                debug!("Generation rejected: {}", rejection);
                return Ok(Outcome::Rejected(rejection));
            }
        };

        let busy = BusyGuard::hold(self, Phase::Generating);
        info!("Generating cards from {} chars", source.chars().count());

        let result = match self.generator.generate(&source).await {
            Ok(batch) if batch.is_empty() => Err(GenerationError::EmptyResult),
            Ok(batch) => {
                let count = batch.len();
                self.update(|s| s.gallery_mut().replace(batch));
                Ok(count)
            }
            Err(source) => Err(GenerationError::ServiceFailed { source }),
        };
        drop(busy);

        match result {
            Ok(count) => {
                info!("Generated {} cards", count);
                self.observer.on_card_selected(0, &self.markers());
                Ok(Outcome::Done(count))
            }
            Err(e) => {
                warn!("{}", e);
                self.observer.on_notice(&Notice::from(&e));
                Err(e)
            }
        }
    }

    /// Same as [`Studio::generate`]: a new batch from the current text,
    /// replacing the previous one.
    pub async fn regenerate(&self) -> Result<Outcome<usize>, GenerationError> {
        self.generate().await
    }

    // ── Gallery ─────────────────────────────────────────────────────────

    /// Make the card at `index` (0-based) the active one.
    pub fn select(&self, index: usize) -> Result<CardArtifact, GalleryError> {
        let result = self.update(|s| {
            let card = s.gallery_mut().select(index)?.clone();
            Ok((card, s.gallery().markers()))
        });
        match result {
            Ok((card, markers)) => {
                self.observer.on_card_selected(index, &markers);
                Ok(card)
            }
            Err(e) => {
                debug!("Selection rejected: {}", e);
                Err(e)
            }
        }
    }

    /// The active card.
    pub fn current(&self) -> Result<CardArtifact, GalleryError> {
        self.lock().gallery().current().cloned()
    }

    // ── Export ──────────────────────────────────────────────────────────

    /// Rasterise the active card.
    pub async fn export_current(&self) -> Result<Outcome<ExportedImage>, ExportError> {
        let gate = self.update(|s| {
            let card = s.gallery().current().ok()?.clone();
            if s.phase().is_busy() {
                return Some(Err(Rejection::Busy { phase: s.phase() }));
            }
            s.set_phase(Phase::Exporting);
            Some(Ok(card))
        });
        let card = match gate {
            None => {
                let e = ExportError::NothingToExport;
                self.observer.on_notice(&Notice::from(&e));
                return Err(e);
            }
            Some(Err(rejection)) => {
                debug!("Export rejected: {}", rejection);
                return Ok(Outcome::Rejected(rejection));
            }
            Some(Ok(card)) => card,
        };

        let busy = BusyGuard::hold(self, Phase::Exporting);
        info!("Exporting card {}", card.ordinal());
        let result = self.exporter.export(&card).await;
        drop(busy);

        match result {
            Ok(image) => {
                info!("Exported {} ({} bytes)", image.file_name, image.png.len());
                Ok(Outcome::Done(image))
            }
            Err(e) => {
                warn!("{}", e);
                self.observer.on_notice(&Notice::from(&e));
                Err(e)
            }
        }
    }

    // ── Reset ───────────────────────────────────────────────────────────

    /// Drop the source text and all cards. Turned away while busy.
    pub fn reset(&self) -> Outcome<()> {
        let result = self.update(|s| {
            if s.phase().is_busy() {
                return Outcome::Rejected(Rejection::Busy { phase: s.phase() });
            }
            s.reset();
            Outcome::Done(())
        });
        if result.is_done() {
            self.observer.on_source_changed(0);
        }
        result
    }

    // ── Internal helpers ────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the session under the lock, then publish phase and trigger
    /// changes with the lock released.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let min = self.config.min_source_chars;
        let (result, before, after) = {
            let mut session = self.lock();
            let before = session.snapshot(min);
            let result = f(&mut session);
            let after = session.snapshot(min);
            (result, before, after)
        };

        if before.phase != after.phase {
            debug!("Phase {} → {}", before.phase, after.phase);
            self.observer.on_phase_change(before.phase, after.phase);
        }
        if before.triggers != after.triggers {
            self.observer.on_triggers_changed(&after.triggers);
        }
        result
    }
}

/// Holds a busy phase; dropping it settles the session again.
struct BusyGuard<'a> {
    studio: &'a Studio,
    phase: Phase,
}

impl<'a> BusyGuard<'a> {
    fn hold(studio: &'a Studio, phase: Phase) -> Self {
        Self { studio, phase }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let min = self.studio.config.min_source_chars;
        let held = self.phase;
        self.studio.update(|s| {
            if s.phase() == held {
                let settled = s.settled_phase(min);
                s.set_phase(settled);
            }
        });
    }
}

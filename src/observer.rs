//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via [`crate::Studio::with_observer`]
//! to drive a UI from the session: phase changes, trigger enable/disable,
//! the active card marker, and user-facing notices.
//!
//! Events are emitted after the session lock is released, so an observer may
//! call back into the studio (e.g. read a snapshot).
//!
//! # Example
//!
//! ```rust
//! use text2card::{Notice, SessionObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct AlertCounter {
//!     alerts: AtomicUsize,
//! }
//!
//! impl SessionObserver for AlertCounter {
//!     fn on_notice(&self, notice: &Notice) {
//!         self.alerts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}", notice.message);
//!     }
//! }
//!
//! let observer: Arc<dyn SessionObserver> = Arc::new(AlertCounter {
//!     alerts: AtomicUsize::new(0),
//! });
//! ```

use crate::error::{AcquireError, ExportError, GenerationError};
use crate::session::{Phase, TriggerState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Receives session events. All methods default to no-ops.
pub trait SessionObserver: Send + Sync {
    /// The session moved from one phase to another.
    fn on_phase_change(&self, from: Phase, to: Phase) {
        let _ = (from, to);
    }

    /// Trigger enable/disable state or the export label changed.
    fn on_triggers_changed(&self, triggers: &TriggerState) {
        let _ = triggers;
    }

    /// The source text was replaced.
    ///
    /// # Arguments
    /// * `chars` — length of the new text in characters
    fn on_source_changed(&self, chars: usize) {
        let _ = chars;
    }

    /// Source text was loaded from a file; fired after `on_source_changed`.
    fn on_file_loaded(&self, name: &str, chars: usize) {
        let _ = (name, chars);
    }

    /// A card became the active one.
    ///
    /// # Arguments
    /// * `index`   — 0-based index of the active card
    /// * `markers` — one flag per card, exactly one of them set
    fn on_card_selected(&self, index: usize, markers: &[bool]) {
        let _ = (index, markers);
    }

    /// Something failed and the user should be told.
    fn on_notice(&self, notice: &Notice) {
        let _ = notice;
    }
}

/// Observer that ignores every event. The default for a new studio.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the observer stored in a studio.
pub type SharedObserver = Arc<dyn SessionObserver>;

/// Which operation a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    UnsupportedFormat,
    ReadFailed,
    ParseFailed,
    GenerationFailed,
    NothingToExport,
    ExportFailed,
}

/// A human-readable failure message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl From<&AcquireError> for Notice {
    fn from(e: &AcquireError) -> Self {
        match e {
            AcquireError::UnsupportedFormat { .. } => Notice::new(
                NoticeKind::UnsupportedFormat,
                "Unsupported file format. Please upload a TXT, DOCX or PDF file.",
            ),
            AcquireError::ReadFailed { .. } => Notice::new(
                NoticeKind::ReadFailed,
                "Could not read the file. Please try again.",
            ),
            AcquireError::ParseFailed { .. } => Notice::new(
                NoticeKind::ParseFailed,
                "Could not extract text from the file. Try again or paste the text directly.",
            ),
        }
    }
}

impl From<&GenerationError> for Notice {
    fn from(e: &GenerationError) -> Self {
        let message = match e {
            GenerationError::ServiceFailed { .. } => "Card generation failed. Please try again.",
            GenerationError::EmptyResult => {
                "The generator produced no cards. Please try again."
            }
        };
        Notice::new(NoticeKind::GenerationFailed, message)
    }
}

impl From<&ExportError> for Notice {
    fn from(e: &ExportError) -> Self {
        match e {
            ExportError::NothingToExport => Notice::new(
                NoticeKind::NothingToExport,
                "Generate cards before downloading one.",
            ),
            ExportError::RasterizationFailed { .. } => Notice::new(
                NoticeKind::ExportFailed,
                "Image generation failed. Please try again.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::Mutex;

    struct Recording {
        phases: Mutex<Vec<(Phase, Phase)>>,
        notices: Mutex<Vec<NoticeKind>>,
    }

    impl SessionObserver for Recording {
        fn on_phase_change(&self, from: Phase, to: Phase) {
            self.phases.lock().unwrap().push((from, to));
        }

        fn on_notice(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.kind);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_phase_change(Phase::Idle, Phase::Ready);
        o.on_source_changed(12);
        o.on_card_selected(0, &[true, false]);
        o.on_notice(&Notice::from(&ExportError::NothingToExport));
    }

    #[test]
    fn recording_observer_receives_events() {
        let rec = Recording {
            phases: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        };
        rec.on_phase_change(Phase::Ready, Phase::Generating);
        rec.on_notice(&Notice::from(&GenerationError::EmptyResult));
        assert_eq!(
            *rec.phases.lock().unwrap(),
            vec![(Phase::Ready, Phase::Generating)]
        );
        assert_eq!(
            *rec.notices.lock().unwrap(),
            vec![NoticeKind::GenerationFailed]
        );
    }

    #[test]
    fn every_user_facing_error_has_a_message() {
        let notices = [
            Notice::from(&AcquireError::UnsupportedFormat {
                name: "a.png".into(),
                media_type: "image/png".into(),
            }),
            Notice::from(&AcquireError::ReadFailed {
                name: "a.txt".into(),
                detail: "gone".into(),
            }),
            Notice::from(&AcquireError::ParseFailed {
                name: "a.pdf".into(),
                source: ServiceError::Timeout { secs: 1 },
            }),
            Notice::from(&GenerationError::ServiceFailed {
                source: ServiceError::Transport("refused".into()),
            }),
            Notice::from(&ExportError::RasterizationFailed {
                ordinal: 1,
                detail: "x".into(),
            }),
        ];
        for n in notices {
            assert!(!n.message.is_empty());
        }
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: SharedObserver = Arc::new(NoopObserver);
        o.on_triggers_changed(&TriggerState {
            generate_enabled: true,
            generating: false,
            export_enabled: false,
            export_label: "Download card".into(),
        });
    }
}

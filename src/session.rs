//! Session state: source text, phase, and the card gallery.
//!
//! The [`Session`] is the only mutable state of a studio. It is owned by
//! the [`crate::Studio`] and mutated through it; each component writes only
//! its own fields (acquisition → source text, generation → phase and batch,
//! gallery → selection).

use crate::gallery::Gallery;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session stands in the idle → generate → preview → export flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Source text is missing or too short to generate from.
    Idle,
    /// Source text is long enough; no cards yet.
    Ready,
    /// A generation call is in flight.
    Generating,
    /// At least one card is available for preview.
    Previewing,
    /// An export is in flight.
    Exporting,
}

impl Phase {
    /// True while a generation or an export is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Generating | Phase::Exporting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Ready => "ready",
            Phase::Generating => "generating",
            Phase::Previewing => "previewing",
            Phase::Exporting => "exporting",
        };
        f.write_str(s)
    }
}

/// Label of the export trigger while idle.
pub const EXPORT_LABEL: &str = "Download card";
/// Label of the export trigger while an export is in flight.
pub const EXPORT_BUSY_LABEL: &str = "Rendering image…";

/// Enabled/disabled state of the two user triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub generate_enabled: bool,
    pub generating: bool,
    pub export_enabled: bool,
    pub export_label: String,
}

/// The result of a guarded operation that may be turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran to completion.
    Done(T),
    /// The operation was not started; the session is unchanged.
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }
}

/// Why an operation was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// The source text is shorter than the configured minimum.
    SourceTooShort { chars: usize, min: usize },
    /// Another generation or export is in flight.
    Busy { phase: Phase },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SourceTooShort { chars, min } => {
                write!(f, "source text has {chars} characters, at least {min} required")
            }
            Rejection::Busy { phase } => write!(f, "session is busy ({phase})"),
        }
    }
}

/// Mutable state of one conversion session.
#[derive(Debug, Clone)]
pub struct Session {
    source_text: String,
    phase: Phase,
    gallery: Gallery,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            source_text: String::new(),
            phase: Phase::Idle,
            gallery: Gallery::default(),
        }
    }
}

impl Session {
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Length of the source text in characters, not bytes.
    pub fn source_chars(&self) -> usize {
        self.source_text.chars().count()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub(crate) fn gallery_mut(&mut self) -> &mut Gallery {
        &mut self.gallery
    }

    pub(crate) fn set_source_text(&mut self, text: String) {
        self.source_text = text;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Recompute the phase from the data unless an operation is in flight.
    pub(crate) fn settle(&mut self, min_chars: usize) {
        if self.phase.is_busy() {
            return;
        }
        self.phase = self.settled_phase(min_chars);
    }

    /// The phase this session rests in when nothing is in flight.
    pub(crate) fn settled_phase(&self, min_chars: usize) -> Phase {
        if !self.gallery.is_empty() {
            Phase::Previewing
        } else if self.source_chars() >= min_chars {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Session::default();
    }

    pub fn triggers(&self, min_chars: usize) -> TriggerState {
        let busy = self.phase.is_busy();
        TriggerState {
            generate_enabled: !busy && self.source_chars() >= min_chars,
            generating: self.phase == Phase::Generating,
            export_enabled: !busy && !self.gallery.is_empty(),
            export_label: if self.phase == Phase::Exporting {
                EXPORT_BUSY_LABEL.to_string()
            } else {
                EXPORT_LABEL.to_string()
            },
        }
    }

    pub fn snapshot(&self, min_chars: usize) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            source_chars: self.source_chars(),
            card_count: self.gallery.len(),
            selected_index: self.gallery.selected_index(),
            triggers: self.triggers(min_chars),
        }
    }
}

/// Serialisable view of a session, for UIs and `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub source_chars: usize,
    pub card_count: usize,
    pub selected_index: Option<usize>,
    pub triggers: TriggerState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::GeneratedCard;

    #[test]
    fn fresh_session_is_idle() {
        let s = Session::default();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.source_text(), "");
        let t = s.triggers(10);
        assert!(!t.generate_enabled);
        assert!(!t.export_enabled);
        assert_eq!(t.export_label, EXPORT_LABEL);
    }

    #[test]
    fn source_length_counts_characters() {
        let mut s = Session::default();
        s.set_source_text("概念卡片生成工具演示文本".to_string());
        assert_eq!(s.source_chars(), 12);
        s.settle(10);
        assert_eq!(s.phase(), Phase::Ready);
    }

    #[test]
    fn settle_prefers_previewing_when_cards_exist() {
        let mut s = Session::default();
        s.gallery_mut().replace(vec![GeneratedCard::new("<div></div>")]);
        s.settle(10);
        assert_eq!(s.phase(), Phase::Previewing);
    }

    #[test]
    fn settle_leaves_busy_phase_alone() {
        let mut s = Session::default();
        s.set_phase(Phase::Generating);
        s.settle(10);
        assert_eq!(s.phase(), Phase::Generating);
    }

    #[test]
    fn exporting_disables_both_triggers() {
        let mut s = Session::default();
        s.set_source_text("long enough source text".into());
        s.gallery_mut().replace(vec![GeneratedCard::new("<div></div>")]);
        s.set_phase(Phase::Exporting);
        let t = s.triggers(10);
        assert!(!t.generate_enabled);
        assert!(!t.export_enabled);
        assert_eq!(t.export_label, EXPORT_BUSY_LABEL);
    }

    #[test]
    fn rejection_display() {
        let r = Rejection::SourceTooShort { chars: 2, min: 10 };
        assert!(r.to_string().contains("at least 10"));
        let r = Rejection::Busy {
            phase: Phase::Generating,
        };
        assert!(r.to_string().contains("generating"));
    }
}

//! The ordered set of generated cards and the current selection.
//!
//! Navigation is purely index based: no wraparound, no reordering. A batch is
//! only ever replaced as a whole, so a card from an older round can never be
//! reached once a new round has landed.

use crate::error::GalleryError;
use serde::{Deserialize, Serialize};

/// One generated rendering.
///
/// Artifacts are created in batches by [`Gallery::replace`] and are immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardArtifact {
    markup: String,
    style: Option<String>,
    ordinal: usize,
}

impl CardArtifact {
    /// Renderable HTML of the card.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Style label reported by the generator, if any.
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// 1-based position in its batch.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// A card as handed back by a generator, before it joins a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub markup: String,
    pub style: Option<String>,
}

impl GeneratedCard {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Ordered candidates plus the selected index.
///
/// Invariant: `selected < cards.len()` whenever `cards` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    cards: Vec<CardArtifact>,
    selected: usize,
}

impl Gallery {
    /// Replace the whole batch and select the first card.
    pub(crate) fn replace(&mut self, batch: Vec<GeneratedCard>) {
        self.cards = batch
            .into_iter()
            .enumerate()
            .map(|(i, card)| CardArtifact {
                markup: card.markup,
                style: card.style,
                ordinal: i + 1,
            })
            .collect();
        self.selected = 0;
    }

    /// Select the card at `index` (0-based).
    pub fn select(&mut self, index: usize) -> Result<&CardArtifact, GalleryError> {
        if index >= self.cards.len() {
            return Err(GalleryError::IndexOutOfRange {
                index,
                len: self.cards.len(),
            });
        }
        self.selected = index;
        Ok(&self.cards[index])
    }

    /// The selected card.
    pub fn current(&self) -> Result<&CardArtifact, GalleryError> {
        self.cards.get(self.selected).ok_or(GalleryError::Empty)
    }

    /// Selected index, or `None` when the gallery is empty.
    pub fn selected_index(&self) -> Option<usize> {
        (!self.cards.is_empty()).then_some(self.selected)
    }

    /// One "active" marker per card; exactly one is set when non-empty.
    pub fn markers(&self) -> Vec<bool> {
        (0..self.cards.len()).map(|i| i == self.selected).collect()
    }

    pub fn cards(&self) -> &[CardArtifact] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(names: &[&str]) -> Vec<GeneratedCard> {
        names.iter().map(|n| GeneratedCard::new(*n)).collect()
    }

    #[test]
    fn empty_gallery_has_no_selection() {
        let g = Gallery::default();
        assert!(g.is_empty());
        assert_eq!(g.selected_index(), None);
        assert_eq!(g.current(), Err(GalleryError::Empty));
        assert!(g.markers().is_empty());
    }

    #[test]
    fn replace_assigns_ordinals_and_resets_selection() {
        let mut g = Gallery::default();
        g.replace(batch(&["a", "b", "c"]));
        g.select(2).unwrap();

        g.replace(batch(&["x", "y"]));
        assert_eq!(g.selected_index(), Some(0));
        assert_eq!(g.current().unwrap().markup(), "x");
        let ordinals: Vec<usize> = g.cards().iter().map(|c| c.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[test]
    fn select_in_range_moves_marker() {
        let mut g = Gallery::default();
        g.replace(batch(&["a", "b", "c"]));
        let card = g.select(1).unwrap();
        assert_eq!(card.markup(), "b");
        assert_eq!(g.markers(), vec![false, true, false]);
    }

    #[test]
    fn select_out_of_range_leaves_state() {
        let mut g = Gallery::default();
        g.replace(batch(&["a", "b"]));
        g.select(1).unwrap();
        assert_eq!(
            g.select(2),
            Err(GalleryError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(g.selected_index(), Some(1));
    }

    #[test]
    fn markers_have_exactly_one_active() {
        let mut g = Gallery::default();
        g.replace(batch(&["a", "b", "c", "d"]));
        for i in 0..4 {
            g.select(i).unwrap();
            let markers = g.markers();
            assert_eq!(markers.iter().filter(|m| **m).count(), 1);
            assert!(markers[i]);
        }
    }

    #[test]
    fn style_is_carried_onto_artifact() {
        let mut g = Gallery::default();
        g.replace(batch(&["a"]).into_iter().map(|c| c.with_style("dark")).collect());
        assert_eq!(g.current().unwrap().style(), Some("dark"));
    }
}

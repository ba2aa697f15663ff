//! Keeps the same logical item anchored across viewport geometry changes.
//!
//! A resize runs in two phases that bracket the host's own frame change:
//!
//! 1. `StripView::will_resize` captures an [`ItemAnchor`] (leading item + fraction scrolled
//!    into it) while the old geometry is still in place.
//! 2. `StripView::did_resize` applies the new viewport, converts the anchor back into a
//!    content offset using the new item span, and rebuilds the visible slots.

/// Tolerance applied when mapping offsets to indices, so that an offset restored as
/// `index * span` never lands a rounding error short of `index`.
pub(crate) const INDEX_EPSILON: f64 = 1e-9;

/// Where the strip is in the resize state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResizePhase {
    #[default]
    Stable,
    CapturingState,
    Resized,
    Restored,
}

/// A scroll position expressed relative to an item rather than in absolute points.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemAnchor {
    pub item_index: usize,
    /// Fraction of the item span scrolled past, `0.0..1.0` for in-bounds offsets.
    ///
    /// Negative while bouncing before the first item; may exceed `1.0` when overscrolled
    /// past the last one.
    pub fraction: f64,
}

/// Captures the anchor for `content_offset` given the current span and item count.
pub fn capture_anchor(content_offset: f64, item_span: f64, item_count: usize) -> ItemAnchor {
    if item_span <= 0.0 || item_count == 0 {
        return ItemAnchor {
            item_index: 0,
            fraction: 0.0,
        };
    }
    if content_offset < 0.0 {
        return ItemAnchor {
            item_index: 0,
            fraction: content_offset / item_span,
        };
    }

    let item_index = index_at(content_offset / item_span + INDEX_EPSILON, item_count);
    let fraction = (content_offset - item_index as f64 * item_span) / item_span;
    ItemAnchor {
        item_index,
        // Drop the epsilon residue so exact boundaries read as 0.
        fraction: if fraction.abs() < INDEX_EPSILON {
            0.0
        } else {
            fraction
        },
    }
}

/// Converts an anchor back into a content offset for `item_span`.
pub fn anchored_offset(anchor: ItemAnchor, item_span: f64) -> f64 {
    (anchor.item_index as f64 + anchor.fraction) * item_span
}

/// Maps a position measured in item spans onto a valid index.
pub(crate) fn index_at(position: f64, item_count: usize) -> usize {
    if item_count == 0 || position.is_nan() || position <= 0.0 {
        return 0;
    }
    (position as usize).min(item_count - 1)
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct GeometryPreserver {
    phase: ResizePhase,
    anchor: Option<ItemAnchor>,
}

impl GeometryPreserver {
    pub(crate) fn phase(&self) -> ResizePhase {
        self.phase
    }

    pub(crate) fn capture(&mut self, anchor: ItemAnchor) {
        vdebug!(
            item_index = anchor.item_index,
            fraction = anchor.fraction,
            "resize: captured anchor"
        );
        self.anchor = Some(anchor);
        self.phase = ResizePhase::CapturingState;
    }

    /// Takes the captured anchor, leaving the preserver in `Resized`.
    pub(crate) fn take_for_resize(&mut self) -> Option<ItemAnchor> {
        self.phase = ResizePhase::Resized;
        self.anchor.take()
    }

    pub(crate) fn mark_restored(&mut self) {
        self.phase = ResizePhase::Restored;
    }

    pub(crate) fn finish(&mut self) {
        self.phase = ResizePhase::Stable;
    }
}

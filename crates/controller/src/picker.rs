//! Geometry of the transition picker row.

use device_io::UiElement;

use crate::ids;

/// Vertical jitter tolerated between items of one row.
const ROW_TOLERANCE_PX: i32 = 2;

/// Extra positions between the category label and the first item once the
/// row has been scrolled. Empirical; tied to the app's picker layout.
pub const SCROLLED_ROW_OFFSET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRow {
    /// Snapshot position of the category label.
    pub anchor_pos: usize,
    /// Top edge shared by the row's items.
    pub top: i32,
    /// Items currently rendered in the row.
    pub visible: usize,
}

impl TransitionRow {
    /// Scans `snapshot` for the category label and the items aligned with
    /// the element two positions after it.
    pub fn scan(snapshot: &[UiElement]) -> Option<Self> {
        let anchor_pos = snapshot
            .iter()
            .position(|el| el.text == ids::TRANSITION_ANCHOR)?;
        let top = snapshot.get(anchor_pos + 2)?.bounds.top;
        let visible = snapshot[anchor_pos..]
            .iter()
            .filter(|el| el.text != ids::TRANSITION_ANCHOR)
            .filter(|el| (el.bounds.top - top).abs() < ROW_TOLERANCE_PX)
            .count();
        Some(Self {
            anchor_pos,
            top,
            visible,
        })
    }

    /// Whether the option at 1-based `ordinal` lies beyond the rendered items.
    pub fn needs_scroll(&self, ordinal: usize) -> bool {
        ordinal.saturating_sub(1) > self.visible
    }

    /// Snapshot position of the option at `ordinal` in the unscrolled row.
    pub fn position(&self, ordinal: usize) -> usize {
        self.anchor_pos + ordinal
    }

    /// Whether `el` is one of the row's items. The offset arithmetic can land
    /// past the last item, so a resolved position is only trusted when this
    /// holds.
    pub fn holds(&self, el: &UiElement) -> bool {
        el.text != ids::TRANSITION_ANCHOR && (el.bounds.top - self.top).abs() < ROW_TOLERANCE_PX
    }

    /// Snapshot position of the option after one scroll of the row.
    pub fn scrolled_position(&self, ordinal: usize) -> Option<usize> {
        if self.visible == 0 {
            return None;
        }
        Some(self.anchor_pos + ordinal % self.visible + SCROLLED_ROW_OFFSET)
    }
}

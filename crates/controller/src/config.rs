use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ControlError;

/// Pauses after gestures so UI animations finish before the next snapshot.
/// These trade speed for measurement accuracy; nothing depends on them for
/// correctness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettleTimings {
    pub after_seek_gesture_ms: u64,
    pub after_scroll_ms: u64,
    pub after_vertical_scroll_ms: u64,
    pub after_focus_tap_ms: u64,
    pub after_dialog_open_ms: u64,
    pub after_field_focus_ms: u64,
    pub after_confirm_ms: u64,
    pub after_handle_drag_ms: u64,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            after_seek_gesture_ms: 200,
            after_scroll_ms: 1000,
            after_vertical_scroll_ms: 0,
            after_focus_tap_ms: 500,
            after_dialog_open_ms: 500,
            after_field_focus_ms: 100,
            after_confirm_ms: 500,
            after_handle_drag_ms: 1000,
        }
    }
}

impl SettleTimings {
    /// No pauses at all, for simulated devices.
    pub fn immediate() -> Self {
        Self {
            after_seek_gesture_ms: 0,
            after_scroll_ms: 0,
            after_vertical_scroll_ms: 0,
            after_focus_tap_ms: 0,
            after_dialog_open_ms: 0,
            after_field_focus_ms: 0,
            after_confirm_ms: 0,
            after_handle_drag_ms: 0,
        }
    }
}

pub(crate) async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeekConfig {
    pub max_iterations: usize,
    /// Gestures stop this far from the screen edge.
    pub safe_margin_px: i32,
    /// Drag speed in px/ms; slower drags avoid flings.
    pub drag_speed: f64,
    pub min_gesture_ms: u64,
    pub max_gesture_ms: u64,
    /// Below this remaining error a fixed gesture length is used to avoid
    /// overshooting on minimum-duration flings.
    pub fine_error: f64,
    pub fine_gesture_ms: u64,
    /// Tolerance when the seek only needs to land inside a clip.
    pub coarse_tolerance: f64,
    /// Tolerance when the seek must land on a clip boundary.
    pub fine_tolerance: f64,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            safe_margin_px: 100,
            drag_speed: 2.0,
            min_gesture_ms: 300,
            max_gesture_ms: 2000,
            fine_error: 0.3,
            fine_gesture_ms: 600,
            coarse_tolerance: 3.5,
            fine_tolerance: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocatorConfig {
    pub horizontal_attempts: usize,
    pub vertical_scrolls: usize,
    pub row_swipe_from_x: i32,
    pub row_swipe_to_x: i32,
    /// Row to swipe along when no anchor label has been seen.
    pub default_row_y: i32,
    pub vertical_scroll_x: i32,
    pub vertical_scroll_from_y: i32,
    pub vertical_scroll_to_y: i32,
    pub swipe_ms: u64,
    pub toolbar_rewinds: usize,
    pub toolbar_swipes: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            horizontal_attempts: 5,
            vertical_scrolls: 8,
            row_swipe_from_x: 900,
            row_swipe_to_x: 200,
            default_row_y: 1700,
            vertical_scroll_x: 500,
            vertical_scroll_from_y: 800,
            vertical_scroll_to_y: 300,
            swipe_ms: 600,
            toolbar_rewinds: 5,
            toolbar_swipes: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Overlap consumed by one transition.
    pub transition_time: f64,
    /// Offset applied to computed tap positions so they land inside the clip.
    pub tap_nudge_px: i32,
    /// Clips longer than this get their effect extended by tapping the end
    /// marker; shorter ones get a computed drag.
    pub long_clip_threshold: f64,
    /// Length of an effect region right after it is applied.
    pub effect_initial_span: f64,
    pub effect_drag_ms: u64,
    pub transition_row_swipe_to_x: i32,
    pub transition_row_swipe_dy: i32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            transition_time: timeline::DEFAULT_TRANSITION_TIME,
            tap_nudge_px: 5,
            long_clip_threshold: 3.5,
            effect_initial_span: 3.0,
            effect_drag_ms: 2000,
            transition_row_swipe_to_x: 100,
            transition_row_swipe_dy: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub timings: SettleTimings,
    pub seek: SeekConfig,
    pub locator: LocatorConfig,
    pub protocol: ProtocolConfig,
}

impl ControlConfig {
    pub fn from_file(path: &Path) -> Result<Self, ControlError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ControlError::InvalidArgument(
            format!("config {:?}: {}", path, e),
        ))?;
        serde_json::from_str(&raw)
            .map_err(|e| ControlError::InvalidArgument(format!("config {:?}: {}", path, e)))
    }

    /// Defaults with every settle delay removed.
    pub fn simulated() -> Self {
        Self {
            timings: SettleTimings::immediate(),
            ..Self::default()
        }
    }
}

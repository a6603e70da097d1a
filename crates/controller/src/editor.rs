use device_io::{find_by_id, DeviceControl};
use serde::Serialize;
use std::sync::Arc;
use timeline::{
    calibrate, AnimationKind, CalibrationConstants, EditAction, Seconds, TimelineMap,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::{settle, ControlConfig};
use crate::ids;
use crate::locator::{
    find_by_resource_id, find_by_text, find_by_text_vertical, find_toolbar_item,
    require_by_resource_id, TextArea,
};
use crate::picker::TransitionRow;
use crate::seek::{self, SeekOutcome};
use crate::context::SessionContext;
use crate::ControlError;

/// What a completed action did, plus anything that went sideways without
/// failing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionReport {
    pub summary: String,
    pub warnings: Vec<String>,
}

impl ActionReport {
    fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Which part of the clip strip a focus tap should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusRow {
    Clip,
    Junction,
}

/// Drives one device through the edit protocols.
///
/// Every protocol holds the session lock from its first gesture to its last,
/// so two actions never interleave on the same device.
pub struct Editor<D> {
    device: D,
    session: Mutex<SessionContext>,
    catalog: Arc<Catalog>,
    config: ControlConfig,
}

fn calibrated(session: &SessionContext) -> Result<(CalibrationConstants, TimelineMap), ControlError> {
    let (constants, map) = session.require_calibrated()?;
    Ok((constants, map.clone()))
}

/// Text typed into the numeric duration field.
fn duration_text(duration: Seconds) -> String {
    if duration.fract() == 0.0 {
        format!("{:.1}", duration)
    } else {
        duration.to_string()
    }
}

impl<D: DeviceControl> Editor<D> {
    pub fn new(device: D, session: SessionContext, catalog: Arc<Catalog>, config: ControlConfig) -> Self {
        Self {
            device,
            session: Mutex::new(session),
            catalog,
            config,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn timeline(&self) -> Option<TimelineMap> {
        self.session.lock().await.timeline().cloned()
    }

    pub async fn constants(&self) -> Option<CalibrationConstants> {
        self.session.lock().await.constants().copied()
    }

    pub async fn raw_durations(&self) -> Option<Vec<Seconds>> {
        self.session.lock().await.raw_durations().map(<[Seconds]>::to_vec)
    }

    /// Drops all session state; the next timed action needs a new calibration.
    pub async fn reset(&self) -> Result<(), ControlError> {
        self.session.lock().await.clear()
    }

    /// Measures the scrubber and starts a fresh timeline of `clip_count`
    /// default-length clips. Prior edits are discarded either way; on
    /// failure the session is left uncalibrated.
    pub async fn calibrate(&self, clip_count: usize) -> Result<CalibrationConstants, ControlError> {
        if clip_count == 0 {
            return Err(ControlError::InvalidArgument("clip count must be at least 1".into()));
        }
        let mut session = self.session.lock().await;
        let snapshot = self.device.snapshot().await?;
        match calibrate(&snapshot, ids::SCRUBBER_SEGMENT, clip_count) {
            Ok(calibration) => {
                let constants = calibration.constants;
                session.install_calibration(calibration)?;
                Ok(constants)
            }
            Err(err) => {
                session.invalidate_calibration(clip_count)?;
                Err(err.into())
            }
        }
    }

    pub async fn seek(&self, target: Seconds, allowed_error: Seconds) -> Result<SeekOutcome, ControlError> {
        if !target.is_finite() || target < 0.0 {
            return Err(ControlError::InvalidArgument(format!("seek target {}", target)));
        }
        let session = self.session.lock().await;
        let constants = session
            .constants()
            .copied()
            .ok_or(ControlError::CalibrationMissing)?;
        seek::seek(&self.device, &constants, &self.config, target, allowed_error).await
    }

    /// Reads the editor's total-length readout.
    pub async fn measured_total_duration(&self) -> Result<Seconds, ControlError> {
        let snapshot = self.device.snapshot().await?;
        let el = find_by_id(&snapshot, ids::TOTAL_DURATION)
            .ok_or_else(|| ControlError::not_found(ids::TOTAL_DURATION))?;
        Ok(seek::parse_readout(&el.text))
    }

    pub async fn execute(&self, action: &EditAction) -> Result<ActionReport, ControlError> {
        debug!("executing {}", action);
        match action {
            EditAction::DurationChange { clip, new_duration } => {
                self.change_duration(*clip, *new_duration).await
            }
            EditAction::Transition {
                first,
                second,
                kind,
                apply_to_all,
            } => self.add_transition(*first, *second, kind, *apply_to_all).await,
            EditAction::Effect { clip, effects } => self.apply_effect(*clip, effects).await,
            EditAction::Animation { clip, name, kind } => {
                self.apply_animation(*clip, name, *kind).await
            }
            EditAction::MusicPlacement { at, track } => self.add_music_effect(*at, track).await,
            EditAction::BackgroundMusic { track } => self.add_background_music(track).await,
        }
    }

    /// Coarse seek to `target`, then taps the clip strip where `target`
    /// currently renders, correcting for the residual seek error.
    async fn focus(
        &self,
        constants: &CalibrationConstants,
        target: Seconds,
        row: FocusRow,
    ) -> Result<(), ControlError> {
        seek::seek(
            &self.device,
            constants,
            &self.config,
            target,
            self.config.seek.coarse_tolerance,
        )
        .await?;
        let current = seek::measure_playhead(&self.device).await?;
        let nudge = self.config.protocol.tap_nudge_px;
        let shift = ((current - target) * constants.pixels_per_second) as i32;
        let x = constants.origin.x - shift - nudge;
        let y = match row {
            FocusRow::Clip => constants.origin.y,
            FocusRow::Junction => {
                constants.origin.y + (constants.track_pixel_height / 2.0) as i32 - nudge
            }
        };
        debug!(
            "focus tap at ({}, {}) for {:.2}s (playhead {:.2}s)",
            x, y, target, current
        );
        self.device.tap_at(x, y).await?;
        settle(self.config.timings.after_focus_tap_ms).await;
        Ok(())
    }

    async fn open_tool(&self, name: &str) -> Result<(), ControlError> {
        let tool = find_toolbar_item(&self.device, &self.config, name).await?;
        self.device.tap_by_index(tool.index).await?;
        Ok(())
    }

    async fn tap_id(&self, id: &str) -> Result<(), ControlError> {
        let el = require_by_resource_id(&self.device, id).await?;
        self.device.tap_by_index(el.index).await?;
        Ok(())
    }

    async fn tap_id_center(&self, id: &str) -> Result<(), ControlError> {
        let el = require_by_resource_id(&self.device, id).await?;
        let (x, y) = el.bounds.center();
        self.device.tap_at(x, y).await?;
        Ok(())
    }

    pub async fn change_duration(&self, clip: usize, duration: Seconds) -> Result<ActionReport, ControlError> {
        let mut session = self.session.lock().await;
        let (constants, map) = calibrated(&session)?;
        let mut updated = map.clone();
        let previous = updated.set_duration(clip, duration)?;
        let mut report = ActionReport::new(format!(
            "changed clip {} duration to {}s",
            clip, duration
        ));

        self.focus(&constants, map.clip_midpoint(clip)?, FocusRow::Clip)
            .await?;
        self.open_tool("Duration").await?;

        self.tap_id(ids::BTN_EDIT_DURATION).await?;
        settle(self.config.timings.after_field_focus_ms).await;

        let field = require_by_resource_id(&self.device, ids::EDIT_TEXT).await?;
        info!("entering duration {} for clip {}", duration, clip);
        self.device
            .input_text(&duration_text(duration), field.index)
            .await?;

        self.tap_id(ids::BTN_OK).await?;
        settle(self.config.timings.after_confirm_ms).await;
        self.tap_id(ids::BTN_APPLY).await?;
        settle(self.config.timings.after_confirm_ms).await;

        info!("clip {}: {}s -> {}s", clip, previous, duration);
        session.commit_timeline(updated.clone())?;

        // Committed edits stand even if the playhead cannot be parked again.
        if let Err(err) = self
            .focus(&constants, updated.clip_midpoint(clip)?, FocusRow::Clip)
            .await
        {
            report.warn(format!("refocus on clip {} failed: {}", clip, err));
        }
        Ok(report)
    }

    pub async fn add_transition(
        &self,
        first: usize,
        second: usize,
        kind: &str,
        apply_to_all: bool,
    ) -> Result<ActionReport, ControlError> {
        let mut session = self.session.lock().await;
        let (constants, map) = calibrated(&session)?;
        let ordinal = self.catalog.transition_ordinal(kind)?;
        let mut updated = map.clone();
        updated.apply_transition(first, second, self.config.protocol.transition_time)?;

        let junction = map.junction_time(first, second)?;
        info!("transition '{}' at junction {}-{} ({:.2}s)", kind, first, second, junction);
        self.focus(&constants, junction, FocusRow::Junction).await?;

        let mut snapshot = self.device.snapshot().await?;
        let row = TransitionRow::scan(&snapshot)
            .filter(|row| row.visible > 0)
            .ok_or_else(|| ControlError::not_found("transition picker row"))?;

        let mut target = row.position(ordinal);
        let mut current_row = row;
        if row.needs_scroll(ordinal) {
            let y = row.top + self.config.protocol.transition_row_swipe_dy;
            debug!("'{}' is off-row ({} visible), scrolling", kind, row.visible);
            self.device
                .swipe(
                    (self.config.locator.row_swipe_from_x, y),
                    (self.config.protocol.transition_row_swipe_to_x, y),
                    self.config.locator.swipe_ms,
                )
                .await?;
            settle(self.config.timings.after_scroll_ms).await;
            snapshot = self.device.snapshot().await?;
            target = row
                .scrolled_position(ordinal)
                .ok_or_else(|| ControlError::not_found("transition picker row"))?;
            current_row = TransitionRow::scan(&snapshot).unwrap_or(row);
        }

        let option = snapshot
            .get(target)
            .filter(|el| current_row.holds(el))
            .ok_or_else(|| {
                ControlError::not_found(format!(
                    "transition '{}' (position {} is outside the picker row)",
                    kind, target
                ))
            })?;
        debug!("tapping '{}' at index {} (ordinal {})", option.text, option.index, ordinal);
        self.device.tap_by_index(option.index).await?;

        if apply_to_all {
            self.tap_id(ids::TRANSITION_APPLY_ALL).await?;
            if let Some(confirm) =
                find_by_resource_id(&self.device, ids::TRANSITION_APPLY_ALL_CONFIRM).await?
            {
                let (x, y) = confirm.bounds.center();
                self.device.tap_at(x, y).await?;
            }
        } else {
            self.tap_id(ids::TRANSITION_APPLY).await?;
        }

        session.commit_timeline(updated)?;

        let mut summary = format!("added '{}' transition at junction {}-{}", kind, first, second);
        if apply_to_all {
            summary.push_str(" (applied to all)");
        }
        Ok(ActionReport::new(summary))
    }

    pub async fn apply_effect(&self, clip: usize, effects: &[String]) -> Result<ActionReport, ControlError> {
        let session = self.session.lock().await;
        let (constants, map) = calibrated(&session)?;
        let (start, end) = map.clip_range(clip)?;
        let entries = effects
            .iter()
            .map(|name| self.catalog.effect(name))
            .collect::<Result<Vec<_>, _>>()?;
        let protocol = &self.config.protocol;
        let mut report = ActionReport::new(format!(
            "applied {} effect(s) to clip {}",
            entries.len(),
            clip
        ));

        self.focus(&constants, map.clip_midpoint(clip)?, FocusRow::Clip)
            .await?;
        self.open_tool("Effect").await?;

        for entry in &entries {
            info!("effect '{}' ({}) on clip {}", entry.name, entry.category, clip);
            let actual_start = seek::seek(
                &self.device,
                &constants,
                &self.config,
                start,
                self.config.seek.fine_tolerance,
            )
            .await?
            .time;

            self.tap_id(ids::BTN_ADD_EFFECT).await?;

            find_by_text(
                &self.device,
                &self.config,
                &entry.category,
                Some(ids::EFFECT_MENU_ANCHOR),
                TextArea::Menu,
            )
            .await?
            .ok_or_else(|| ControlError::not_found(format!("effect category '{}'", entry.category)))?;

            find_by_text(
                &self.device,
                &self.config,
                &entry.name,
                Some(&entry.anchor),
                TextArea::Content,
            )
            .await?
            .ok_or_else(|| {
                ControlError::not_found(format!("effect '{}' in '{}'", entry.name, entry.category))
            })?;

            self.tap_id(ids::BTN_APPLY).await?;

            // The applied region is the element two positions before its label.
            let snapshot = self.device.snapshot().await?;
            let wanted = entry.name.to_lowercase();
            let Some(label) = snapshot.iter().find(|el| el.text.to_lowercase() == wanted) else {
                report.warn(format!("applied '{}' but its label is not visible", entry.name));
                continue;
            };
            let region = label
                .index
                .checked_sub(2)
                .and_then(|i| snapshot.iter().find(|el| el.index == i));
            let Some(region) = region else {
                report.warn(format!("region of '{}' not found, not extended", entry.name));
                continue;
            };

            let handle_x = region.bounds.right + protocol.tap_nudge_px;
            let handle_y = region.bounds.center_y();
            if end - start > protocol.long_clip_threshold {
                debug!("extending '{}' via end marker", entry.name);
                self.device.tap_at(handle_x, handle_y).await?;
                self.tap_id_center(ids::EFFECT_CLIP_END).await?;
            } else {
                let remaining = end - (actual_start + protocol.effect_initial_span);
                let target_x = handle_x + (remaining * constants.pixels_per_second) as i32;
                debug!(
                    "dragging '{}' handle {} -> {} ({:.2}s)",
                    entry.name, handle_x, target_x, remaining
                );
                self.device
                    .swipe((handle_x, handle_y), (target_x, handle_y), protocol.effect_drag_ms)
                    .await?;
                settle(self.config.timings.after_handle_drag_ms).await;
            }
        }

        self.tap_id(ids::BTN_APPLY).await?;
        Ok(report)
    }

    pub async fn apply_animation(
        &self,
        clip: usize,
        name: &str,
        kind: AnimationKind,
    ) -> Result<ActionReport, ControlError> {
        let session = self.session.lock().await;
        let (constants, map) = calibrated(&session)?;
        let midpoint = map.clip_midpoint(clip)?;
        let anchor = self.catalog.animation_anchor(kind)?.to_string();

        self.focus(&constants, midpoint, FocusRow::Clip).await?;
        self.open_tool("Animation").await?;

        let tab = match kind {
            AnimationKind::In => ids::ANIMATION_IN_TAB,
            AnimationKind::Out => ids::ANIMATION_OUT_TAB,
            AnimationKind::Combo => ids::ANIMATION_COMBO_TAB,
        };
        self.tap_id_center(tab).await?;

        find_by_text(&self.device, &self.config, name, Some(&anchor), TextArea::Content)
            .await?
            .ok_or_else(|| ControlError::not_found(format!("{} animation '{}'", kind, name)))?;

        self.tap_id(ids::BTN_APPLY).await?;
        self.focus(&constants, midpoint, FocusRow::Clip).await?;
        Ok(ActionReport::new(format!(
            "applied {} animation '{}' to clip {}",
            kind, name, clip
        )))
    }

    /// Places a timed sound effect at `at`.
    pub async fn add_music_effect(&self, at: Seconds, track: &str) -> Result<ActionReport, ControlError> {
        let session = self.session.lock().await;
        let (constants, _) = calibrated(&session)?;
        let mut report = ActionReport::new(format!("added sound '{}' at {}s", track, at));
        if self.catalog.music_effect(track).is_none() {
            // Without a loaded table there is nothing to check names against.
            if self.catalog.has_music_table() {
                return Err(ControlError::UnknownEntry {
                    table: "music",
                    key: track.to_string(),
                });
            }
            report.warn(format!("'{}' is not in the music table", track));
        }

        self.open_tool("Audio").await?;
        seek::seek(
            &self.device,
            &constants,
            &self.config,
            at,
            self.config.seek.fine_tolerance,
        )
        .await?;

        self.tap_id(ids::BTN_ADD_EFFECT).await?;
        settle(self.config.timings.after_dialog_open_ms).await;

        find_by_text_vertical(&self.device, &self.config, track)
            .await?
            .ok_or_else(|| ControlError::not_found(format!("sound '{}'", track)))?;
        self.tap_id_center(ids::EFFECT_USE).await?;
        self.tap_id(ids::BTN_APPLY).await?;
        Ok(report)
    }

    pub async fn add_background_music(&self, track: &str) -> Result<ActionReport, ControlError> {
        let session = self.session.lock().await;
        let (constants, _) = calibrated(&session)?;

        self.open_tool("Audio").await?;
        seek::seek(
            &self.device,
            &constants,
            &self.config,
            0.0,
            self.config.seek.fine_tolerance,
        )
        .await?;

        self.tap_id(ids::BTN_ADD_TRACK).await?;
        settle(self.config.timings.after_dialog_open_ms).await;

        find_by_text_vertical(&self.device, &self.config, track)
            .await?
            .ok_or_else(|| ControlError::not_found(format!("track '{}'", track)))?;
        self.tap_id_center(ids::MUSIC_USE).await?;
        self.tap_id(ids::BTN_APPLY).await?;
        Ok(ActionReport::new(format!("added background track '{}'", track)))
    }
}

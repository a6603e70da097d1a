//! Closed-loop playhead positioning.
//!
//! A drag on the scrubber is a noisy actuator: inertia and snapping make the
//! travelled time differ from the requested one. The loop therefore measures
//! after every gesture and corrects, and each gesture is bounded by the screen
//! edges, so long jumps take several iterations.

use device_io::{find_by_id, DeviceControl, UiElement};
use timeline::{parse_clock, CalibrationConstants, Seconds};
use tracing::{debug, info, warn};

use crate::config::{settle, ControlConfig, SeekConfig};
use crate::ids;
use crate::ControlError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekOutcome {
    /// Last measured playhead time.
    pub time: Seconds,
    /// False when the iteration budget ran out first; `time` is then a
    /// best-effort position.
    pub converged: bool,
    pub iterations: usize,
}

/// One horizontal drag along the playhead row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub duration_ms: u64,
}

/// Reads the playhead clock from a snapshot. Missing or unreadable text
/// counts as 0.0.
pub fn read_playhead(snapshot: &[UiElement]) -> Seconds {
    let Some(el) = find_by_id(snapshot, ids::CURRENT_POSITION) else {
        warn!("playhead clock not on screen, assuming 0.0");
        return 0.0;
    };
    parse_readout(&el.text)
}

/// Parses an on-screen clock readout. Malformed text counts as 0.0.
pub fn parse_readout(text: &str) -> Seconds {
    match parse_clock(text) {
        Ok(t) => t,
        Err(e) => {
            warn!("{}, assuming 0.0", e);
            0.0
        }
    }
}

pub async fn measure_playhead<D>(device: &D) -> Result<Seconds, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let snapshot = device.snapshot().await?;
    Ok(read_playhead(&snapshot))
}

/// Computes the correction gesture for a remaining error of `diff` seconds
/// (positive means the target lies ahead of the playhead).
///
/// Moving forward drags the scrubber left. Travel stops `safe_margin_px`
/// short of either screen edge, taking the playhead as the screen center.
pub fn plan_gesture(constants: &CalibrationConstants, config: &SeekConfig, diff: Seconds) -> Gesture {
    let origin = constants.origin;
    let screen_width = origin.x * 2;
    let needed = (diff.abs() * constants.pixels_per_second) as i32;

    let end_x = if diff > 0.0 {
        let max_travel = (origin.x - config.safe_margin_px).max(0);
        origin.x - needed.min(max_travel)
    } else {
        let max_travel = (screen_width - origin.x - config.safe_margin_px).max(0);
        origin.x + needed.min(max_travel)
    };

    let distance = (origin.x - end_x).abs() as f64;
    let duration_ms = if diff.abs() < config.fine_error {
        config.fine_gesture_ms
    } else {
        ((distance / config.drag_speed) as u64).clamp(config.min_gesture_ms, config.max_gesture_ms)
    };

    Gesture {
        from: (origin.x, origin.y),
        to: (end_x, origin.y),
        duration_ms,
    }
}

/// Drives the playhead to `target` until it reads within `allowed_error`.
pub async fn seek<D>(
    device: &D,
    constants: &CalibrationConstants,
    config: &ControlConfig,
    target: Seconds,
    allowed_error: Seconds,
) -> Result<SeekOutcome, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let cfg = &config.seek;
    debug!(
        "seeking {:.2}s from origin ({}, {})",
        target, constants.origin.x, constants.origin.y
    );

    for i in 0..cfg.max_iterations {
        let current = measure_playhead(device).await?;
        let diff = target - current;
        if diff.abs() < allowed_error {
            info!("arrived at {:.2}s (target {:.2}s)", current, target);
            return Ok(SeekOutcome {
                time: current,
                converged: true,
                iterations: i,
            });
        }

        let gesture = plan_gesture(constants, cfg, diff);
        debug!(
            "step {}: current={:.2}s error={:.2}s drag {} -> {} over {}ms",
            i + 1,
            current,
            diff,
            gesture.from.0,
            gesture.to.0,
            gesture.duration_ms
        );
        device
            .swipe(gesture.from, gesture.to, gesture.duration_ms)
            .await?;
        settle(config.timings.after_seek_gesture_ms).await;
    }

    let time = measure_playhead(device).await?;
    warn!(
        "seek stopped after {} steps at {:.2}s (target {:.2}s)",
        cfg.max_iterations, time, target
    );
    Ok(SeekOutcome {
        time,
        converged: (target - time).abs() < allowed_error,
        iterations: cfg.max_iterations,
    })
}

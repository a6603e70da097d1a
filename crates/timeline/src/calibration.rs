use device_io::UiElement;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ScreenPoint, Seconds, TimelineError, TimelineMap, DEFAULT_CLIP_DURATION};

/// The scrubber renders each default-length clip as a run of equal chunks;
/// chunks 1..=3 together span exactly one default clip duration.
const MEASURED_SEGMENTS: [usize; 3] = [1, 2, 3];
pub const MIN_SEGMENTS: usize = 4;

/// Physical constants of the timeline view, derived once per session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    pub pixels_per_second: f64,
    /// Where the playhead line sits. The scrubber scrolls underneath it, so
    /// this point never moves.
    pub origin: ScreenPoint,
    pub track_pixel_height: f64,
}

impl CalibrationConstants {
    pub fn seconds_to_pixels(&self, seconds: Seconds) -> i32 {
        (seconds * self.pixels_per_second) as i32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub constants: CalibrationConstants,
    pub timeline: TimelineMap,
}

/// Measures the scrubber in `snapshot` and builds a fresh timeline of
/// `clip_count` default-length clips.
///
/// Segment 0 hugs the playhead and is only partially rendered, so it is used
/// for geometry and skipped for scale.
pub fn calibrate(
    snapshot: &[UiElement],
    segment_id: &str,
    clip_count: usize,
) -> Result<Calibration, TimelineError> {
    let segments: Vec<&UiElement> = snapshot.iter().filter(|el| el.has_id(segment_id)).collect();
    if segments.len() < MIN_SEGMENTS {
        warn!(
            "calibration found {} scrubber segments, needs {}",
            segments.len(),
            MIN_SEGMENTS
        );
        return Err(TimelineError::InsufficientSegments {
            found: segments.len(),
            needed: MIN_SEGMENTS,
        });
    }

    let mut total_width = 0.0;
    for i in MEASURED_SEGMENTS {
        let width = segments[i].bounds.width();
        debug!("segment {} width: {}px", i, width);
        total_width += width as f64;
    }
    let pixels_per_second = total_width / DEFAULT_CLIP_DURATION;
    if pixels_per_second <= 0.0 {
        return Err(TimelineError::DegenerateScale(pixels_per_second));
    }

    let anchor = segments[0].bounds;
    let constants = CalibrationConstants {
        pixels_per_second,
        origin: ScreenPoint::new(anchor.right, anchor.center_y()),
        track_pixel_height: anchor.height() as f64,
    };
    info!(
        "calibrated: 1s = {:.2}px, playhead at ({}, {}), {} clips",
        pixels_per_second, constants.origin.x, constants.origin.y, clip_count
    );

    Ok(Calibration {
        constants,
        timeline: TimelineMap::with_defaults(clip_count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_io::Bounds;

    const SEGMENT: &str = "pkg:id/layout";

    fn element(index: usize, id: &str, bounds: Bounds) -> UiElement {
        UiElement {
            index,
            resource_id: id.to_string(),
            text: String::new(),
            bounds,
        }
    }

    fn scrubber(widths: &[i32]) -> Vec<UiElement> {
        let mut out = vec![element(0, "pkg:id/other", Bounds::new(0, 0, 1080, 200))];
        let mut left = 300;
        for (i, w) in widths.iter().enumerate() {
            out.push(element(i + 1, SEGMENT, Bounds::new(left, 1200, left + w, 1320)));
            left += w;
        }
        out
    }

    #[test]
    fn test_calibrate_measures_scale_and_origin() {
        let snapshot = scrubber(&[240, 150, 150, 200, 150]);
        let cal = calibrate(&snapshot, SEGMENT, 4).unwrap();
        assert_eq!(cal.constants.pixels_per_second, 100.0);
        assert_eq!(cal.constants.origin, ScreenPoint::new(540, 1260));
        assert_eq!(cal.constants.track_pixel_height, 120.0);
        assert_eq!(cal.timeline, TimelineMap::with_defaults(4));
    }

    #[test]
    fn test_calibrate_requires_four_segments() {
        let snapshot = scrubber(&[240, 150, 150]);
        assert_eq!(
            calibrate(&snapshot, SEGMENT, 2),
            Err(TimelineError::InsufficientSegments { found: 3, needed: 4 })
        );
    }

    #[test]
    fn test_calibrate_is_repeatable() {
        let snapshot = scrubber(&[240, 160, 170, 180, 90]);
        let first = calibrate(&snapshot, SEGMENT, 3).unwrap();
        let second = calibrate(&snapshot, SEGMENT, 3).unwrap();
        assert_eq!(first, second);
        assert!(first.constants.pixels_per_second > 0.0);
    }

    #[test]
    fn test_calibrate_rejects_zero_width() {
        let snapshot = scrubber(&[240, 0, 0, 0]);
        assert!(matches!(
            calibrate(&snapshot, SEGMENT, 1),
            Err(TimelineError::DegenerateScale(_))
        ));
    }
}

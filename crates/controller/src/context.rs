use session::{load, save, SessionStore};
use timeline::{Calibration, CalibrationConstants, Seconds, TimelineMap};
use tracing::{debug, info};

use crate::ControlError;

const KEY_TIMELINE: &str = "timeline_map";
const KEY_CALIBRATION: &str = "calibration";
const KEY_RAW_DURATIONS: &str = "raw_durations";

/// Everything one editing session knows about the live timeline, backed by a
/// store so it survives across processes.
///
/// Only the action protocols write here, and only while holding the editor's
/// session lock.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    timeline: Option<TimelineMap>,
    constants: Option<CalibrationConstants>,
    raw_durations: Option<Vec<Seconds>>,
}

impl SessionContext {
    pub fn open(store: Box<dyn SessionStore>) -> Result<Self, ControlError> {
        let timeline: Option<TimelineMap> = load(store.as_ref(), KEY_TIMELINE)?;
        // null after a failed calibration
        let constants: Option<CalibrationConstants> =
            load::<Option<CalibrationConstants>>(store.as_ref(), KEY_CALIBRATION)?.flatten();
        let raw_durations: Option<Vec<Seconds>> = load(store.as_ref(), KEY_RAW_DURATIONS)?;
        if let (Some(map), Some(_)) = (&timeline, &constants) {
            info!("restored session with {} clips", map.len());
        }
        Ok(Self {
            store,
            timeline,
            constants,
            raw_durations,
        })
    }

    pub fn timeline(&self) -> Option<&TimelineMap> {
        self.timeline.as_ref()
    }

    pub fn constants(&self) -> Option<&CalibrationConstants> {
        self.constants.as_ref()
    }

    pub fn raw_durations(&self) -> Option<&[Seconds]> {
        self.raw_durations.as_deref()
    }

    /// Both halves of the calibration, or `CalibrationMissing`.
    pub fn require_calibrated(&self) -> Result<(CalibrationConstants, &TimelineMap), ControlError> {
        match (&self.constants, &self.timeline) {
            (Some(c), Some(t)) => Ok((*c, t)),
            _ => Err(ControlError::CalibrationMissing),
        }
    }

    /// Replaces constants and timeline wholesale; prior edits are discarded.
    pub fn install_calibration(&mut self, calibration: Calibration) -> Result<(), ControlError> {
        let raw = calibration.timeline.durations().to_vec();
        save(self.store.as_mut(), KEY_CALIBRATION, &calibration.constants)?;
        save(self.store.as_mut(), KEY_TIMELINE, &calibration.timeline)?;
        save(self.store.as_mut(), KEY_RAW_DURATIONS, &raw)?;
        self.constants = Some(calibration.constants);
        self.timeline = Some(calibration.timeline);
        self.raw_durations = Some(raw);
        Ok(())
    }

    /// A failed calibration leaves default durations and no constants, so
    /// every timed action reports `CalibrationMissing` until the next success.
    pub fn invalidate_calibration(&mut self, clip_count: usize) -> Result<(), ControlError> {
        let timeline = TimelineMap::with_defaults(clip_count);
        save(self.store.as_mut(), KEY_TIMELINE, &timeline)?;
        self.store.set(KEY_CALIBRATION, &serde_json::Value::Null)?;
        self.timeline = Some(timeline);
        self.constants = None;
        Ok(())
    }

    /// Persists a mutated copy of the timeline and adopts it.
    pub fn commit_timeline(&mut self, timeline: TimelineMap) -> Result<(), ControlError> {
        save(self.store.as_mut(), KEY_TIMELINE, &timeline)?;
        debug!("timeline committed: {:?}", timeline.durations());
        self.timeline = Some(timeline);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), ControlError> {
        self.store.clear()?;
        self.timeline = None;
        self.constants = None;
        self.raw_durations = None;
        info!("session cleared");
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::{Seconds, TimelineError};

/// Duration every clip starts with when the editor imports still images.
pub const DEFAULT_CLIP_DURATION: Seconds = 5.0;

/// Default overlap consumed by one transition, split evenly across both clips.
pub const DEFAULT_TRANSITION_TIME: Seconds = 1.0;

/// Per-clip durations of the edited video, in timeline order.
///
/// Clips are addressed 1-based (clip 1 is the first clip) to match how the
/// planner and the editor UI count them. The number of clips is fixed when the
/// map is created; edits only change durations in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineMap {
    durations: Vec<Seconds>,
}

impl TimelineMap {
    pub fn with_defaults(clip_count: usize) -> Self {
        Self {
            durations: vec![DEFAULT_CLIP_DURATION; clip_count],
        }
    }

    pub fn from_durations(durations: Vec<Seconds>) -> Self {
        Self { durations }
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn durations(&self) -> &[Seconds] {
        &self.durations
    }

    fn slot(&self, clip: usize) -> Result<usize, TimelineError> {
        if clip == 0 || clip > self.durations.len() {
            return Err(TimelineError::ClipOutOfRange {
                index: clip,
                len: self.durations.len(),
            });
        }
        Ok(clip - 1)
    }

    pub fn check_clip(&self, clip: usize) -> Result<(), TimelineError> {
        self.slot(clip).map(|_| ())
    }

    pub fn duration(&self, clip: usize) -> Result<Seconds, TimelineError> {
        Ok(self.durations[self.slot(clip)?])
    }

    /// Sum of the durations of every clip before `clip`.
    pub fn clip_start(&self, clip: usize) -> Result<Seconds, TimelineError> {
        let slot = self.slot(clip)?;
        Ok(self.durations[..slot].iter().sum())
    }

    pub fn clip_range(&self, clip: usize) -> Result<(Seconds, Seconds), TimelineError> {
        let start = self.clip_start(clip)?;
        Ok((start, start + self.duration(clip)?))
    }

    pub fn clip_midpoint(&self, clip: usize) -> Result<Seconds, TimelineError> {
        let (start, end) = self.clip_range(clip)?;
        Ok(start + (end - start) / 2.0)
    }

    /// Boundary between `first` and the clip right after it.
    pub fn junction_time(&self, first: usize, second: usize) -> Result<Seconds, TimelineError> {
        self.check_adjacent(first, second)?;
        self.clip_start(second)
    }

    pub fn total_duration(&self) -> Seconds {
        self.durations.iter().sum()
    }

    pub fn check_adjacent(&self, first: usize, second: usize) -> Result<(), TimelineError> {
        if first == 0 || second != first + 1 {
            return Err(TimelineError::NotAdjacent { first, second });
        }
        self.slot(first)?;
        self.slot(second)?;
        Ok(())
    }

    pub fn set_duration(&mut self, clip: usize, duration: Seconds) -> Result<Seconds, TimelineError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimelineError::InvalidDuration(duration));
        }
        let slot = self.slot(clip)?;
        Ok(std::mem::replace(&mut self.durations[slot], duration))
    }

    /// A transition overlaps the junction and eats half of its length from
    /// each neighbouring clip. Rejected if either clip would be used up.
    pub fn apply_transition(
        &mut self,
        first: usize,
        second: usize,
        transition_time: Seconds,
    ) -> Result<(), TimelineError> {
        self.check_adjacent(first, second)?;
        let half = transition_time / 2.0;
        let shortened = (self.durations[first - 1] - half, self.durations[second - 1] - half);
        for remaining in [shortened.0, shortened.1] {
            if remaining <= 0.0 {
                return Err(TimelineError::InvalidDuration(remaining));
            }
        }
        self.durations[first - 1] = shortened.0;
        self.durations[second - 1] = shortened.1;
        Ok(())
    }
}

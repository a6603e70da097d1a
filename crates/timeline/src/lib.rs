use serde::{Deserialize, Serialize};
use thiserror::Error;

mod model;
pub use model::*;
mod calibration;
pub use calibration::*;
mod clock;
pub use clock::*;
mod actions;
pub use actions::*;

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("clip {index} out of range (timeline has {len} clips)")]
    ClipOutOfRange { index: usize, len: usize },
    #[error("clips {first} and {second} are not adjacent")]
    NotAdjacent { first: usize, second: usize },
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
    #[error("calibration needs at least {needed} scrubber segments, found {found}")]
    InsufficientSegments { found: usize, needed: usize },
    #[error("calibration produced a non-positive scale ({0} px/s)")]
    DegenerateScale(f64),
    #[error("malformed clock text: {0:?}")]
    MalformedClock(String),
}

/// Seconds on the edited timeline.
pub type Seconds = f64;

/// Fixed screen location, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

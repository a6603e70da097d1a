use device_io::DeviceError;
use session::StoreError;
use std::path::PathBuf;
use thiserror::Error;
use timeline::TimelineError;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("timeline is not calibrated; run calibrate first")]
    CalibrationMissing,
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("clip {index} out of range (timeline has {len} clips)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("clips {first} and {second} are not adjacent")]
    NotAdjacent { first: usize, second: usize },
    #[error("'{key}' is not in the {table} table")]
    UnknownEntry { table: &'static str, key: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("catalog {path:?}: {reason}")]
    Catalog { path: PathBuf, reason: String },
    #[error("timeline: {0}")]
    Timeline(TimelineError),
    #[error("device: {0}")]
    Device(#[from] DeviceError),
    #[error("session store: {0}")]
    Store(#[from] StoreError),
}

impl From<TimelineError> for ControlError {
    fn from(err: TimelineError) -> Self {
        match err {
            TimelineError::ClipOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            TimelineError::NotAdjacent { first, second } => Self::NotAdjacent { first, second },
            TimelineError::InvalidDuration(d) => {
                Self::InvalidArgument(format!("duration must be positive, got {}", d))
            }
            other => Self::Timeline(other),
        }
    }
}

impl ControlError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ElementNotFound(what.into())
    }

    /// Conditions a plan may reasonably skip past, as opposed to device or
    /// storage faults.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound(_) | Self::UnknownEntry { .. })
    }
}

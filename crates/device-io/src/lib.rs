use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

mod adb;
pub use adb::AdbDevice;
mod uiautomator;
pub use uiautomator::parse_hierarchy;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("adb not found on PATH; please install Android platform-tools")]
    AdbMissing,
    #[error("adb failed: {0}")]
    CommandFailed(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no element with index {0} in the last snapshot")]
    UnknownIndex(usize),
}

/// Screen-space rectangle as reported by the accessibility tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, self.center_y())
    }

    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) / 2
    }

    /// Parses the uiautomator form `[x1,y1][x2,y2]`.
    pub fn parse_bracketed(s: &str) -> Option<Self> {
        let flat = s.replace("][", ",").replace(['[', ']'], "");
        flat.parse().ok()
    }
}

impl FromStr for Bounds {
    type Err = DeviceError;

    /// Parses the flat form `x1,y1,x2,y2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| DeviceError::Parse(format!("bounds '{}': {}", s, e)))?;
        match parts.as_slice() {
            [l, t, r, b] => Ok(Self::new(*l, *t, *r, *b)),
            _ => Err(DeviceError::Parse(format!(
                "bounds '{}': expected 4 coordinates",
                s
            ))),
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiElement {
    /// Position within the snapshot it came from. Only stable for that snapshot.
    pub index: usize,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bounds: Bounds,
}

impl UiElement {
    pub fn has_id(&self, resource_id: &str) -> bool {
        self.resource_id == resource_id
    }

    /// Trimmed, case-folded text used for label matching.
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// The elements currently rendered on screen, in tree order.
pub type Snapshot = Vec<UiElement>;

pub fn find_by_id<'a>(snapshot: &'a [UiElement], resource_id: &str) -> Option<&'a UiElement> {
    snapshot.iter().find(|el| el.has_id(resource_id))
}

/// The live device surface. Every call is a suspension point; a fresh
/// snapshot must be taken after any gesture.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot, DeviceError>;

    async fn tap_by_index(&self, index: usize) -> Result<(), DeviceError>;

    async fn tap_at(&self, x: i32, y: i32) -> Result<(), DeviceError>;

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration_ms: u64,
    ) -> Result<(), DeviceError>;

    async fn input_text(&self, text: &str, index: usize) -> Result<(), DeviceError>;
}

#[async_trait]
impl<T: DeviceControl + ?Sized> DeviceControl for Arc<T> {
    async fn snapshot(&self) -> Result<Snapshot, DeviceError> {
        (**self).snapshot().await
    }

    async fn tap_by_index(&self, index: usize) -> Result<(), DeviceError> {
        (**self).tap_by_index(index).await
    }

    async fn tap_at(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        (**self).tap_at(x, y).await
    }

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration_ms: u64,
    ) -> Result<(), DeviceError> {
        (**self).swipe(from, to, duration_ms).await
    }

    async fn input_text(&self, text: &str, index: usize) -> Result<(), DeviceError> {
        (**self).input_text(text, index).await
    }
}

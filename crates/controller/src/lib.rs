//! Closed-loop control of the editor's timeline: calibration, playhead
//! seeking, scroll-aware element search, and the per-action edit protocols.

mod error;
pub use error::ControlError;
pub mod catalog;
pub use catalog::{Catalog, EffectEntry};
pub mod config;
pub use config::{ControlConfig, LocatorConfig, ProtocolConfig, SeekConfig, SettleTimings};
mod editor;
pub use editor::{ActionReport, Editor};
pub mod ids;
pub mod locator;
pub use locator::TextArea;
pub mod picker;
pub mod seek;
pub use seek::SeekOutcome;
mod context;
pub use context::SessionContext;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::{parse_hierarchy, DeviceControl, DeviceError, Snapshot, UiElement};

const DUMP_PATH: &str = "/sdcard/autocut_window_dump.xml";
const KEYCODE_MOVE_END: &str = "123";
const KEYCODE_DEL: &str = "67";

/// Drives a device through the `adb` binary. Index taps resolve against the
/// most recent snapshot taken through this handle.
pub struct AdbDevice {
    adb: PathBuf,
    serial: Option<String>,
    last_snapshot: Mutex<Snapshot>,
}

impl AdbDevice {
    pub fn new(serial: Option<String>) -> Result<Self, DeviceError> {
        let adb = which::which("adb").map_err(|_| DeviceError::AdbMissing)?;
        Ok(Self {
            adb,
            serial,
            last_snapshot: Mutex::new(Vec::new()),
        })
    }

    async fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut cmd = Command::new(&self.adb);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        let out = cmd
            .args(args)
            .output()
            .await
            .map_err(|e| DeviceError::CommandFailed(e.to_string()))?;
        if !out.status.success() {
            return Err(DeviceError::CommandFailed(
                String::from_utf8_lossy(&out.stderr).into(),
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    async fn input(&self, args: &[&str]) -> Result<(), DeviceError> {
        let mut full = vec!["shell", "input"];
        full.extend_from_slice(args);
        debug!("adb {}", full.join(" "));
        self.run(&full).await.map(|_| ())
    }

    fn element(&self, index: usize) -> Result<UiElement, DeviceError> {
        self.last_snapshot
            .lock()
            .iter()
            .find(|el| el.index == index)
            .cloned()
            .ok_or(DeviceError::UnknownIndex(index))
    }
}

/// `input text` treats spaces as argument separators.
fn escape_input(text: &str) -> String {
    text.replace(' ', "%s")
}

#[async_trait]
impl DeviceControl for AdbDevice {
    async fn snapshot(&self) -> Result<Snapshot, DeviceError> {
        self.run(&["shell", "uiautomator", "dump", DUMP_PATH]).await?;
        let xml = self.run(&["exec-out", "cat", DUMP_PATH]).await?;
        let snapshot = parse_hierarchy(&xml)?;
        debug!("snapshot: {} elements", snapshot.len());
        *self.last_snapshot.lock() = snapshot.clone();
        Ok(snapshot)
    }

    async fn tap_by_index(&self, index: usize) -> Result<(), DeviceError> {
        let (x, y) = self.element(index)?.bounds.center();
        self.tap_at(x, y).await
    }

    async fn tap_at(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.input(&["tap", &x.to_string(), &y.to_string()]).await
    }

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration_ms: u64,
    ) -> Result<(), DeviceError> {
        self.input(&[
            "swipe",
            &from.0.to_string(),
            &from.1.to_string(),
            &to.0.to_string(),
            &to.1.to_string(),
            &duration_ms.to_string(),
        ])
        .await
    }

    async fn input_text(&self, text: &str, index: usize) -> Result<(), DeviceError> {
        let target = self.element(index)?;
        let (x, y) = target.bounds.center();
        self.tap_at(x, y).await?;

        // Clear the existing value before typing the replacement.
        let existing = target.text.chars().count();
        if existing > 0 {
            let mut keys = vec!["keyevent", KEYCODE_MOVE_END];
            keys.extend(std::iter::repeat(KEYCODE_DEL).take(existing));
            self.input(&keys).await?;
        }
        self.input(&["text", &escape_input(text)]).await
    }
}

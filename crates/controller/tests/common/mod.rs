#![allow(dead_code)]

use async_trait::async_trait;
use controller::{ids, Catalog, ControlConfig, Editor, SessionContext};
use device_io::{Bounds, DeviceControl, DeviceError, Snapshot, UiElement};
use parking_lot::Mutex;
use session::MemoryStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use timeline::format_clock;

pub const ORIGIN: (i32, i32) = (540, 1260);
pub const PIXELS_PER_SECOND: f64 = 100.0;
pub const TRACK_HEIGHT: i32 = 120;
pub const TOOLBAR_Y: i32 = 2200;

/// Horizontal swipes shorter than this are handle drags, not page flips.
const PAGE_FLIP_MIN_PX: i32 = 300;
const TOOLBAR_WINDOW: usize = 5;
const TOOLBAR_STEP: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Tap {
    /// Tapped by index; carries the element's id and text at tap time.
    Element { id: String, text: String },
    Point(i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swipe {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub text: String,
    pub bounds: Bounds,
}

pub fn node(id: &str, text: &str, bounds: Bounds) -> Node {
    Node {
        id: id.to_string(),
        text: text.to_string(),
        bounds,
    }
}

pub fn label(text: &str, x: i32, y: i32) -> Node {
    node("", text, Bounds::new(x, y - 30, x + 160, y + 30))
}

pub fn button(id: &str, x: i32, y: i32) -> Node {
    node(id, "", Bounds::new(x - 40, y - 40, x + 40, y + 40))
}

/// Simulated editor screen. Scrub swipes on the playhead row move the
/// playhead by `gain` of the requested distance; other horizontal swipes
/// page `row_pages`, vertical ones page `list_pages`.
pub struct World {
    pub playhead: f64,
    pub gain: f64,
    pub max_time: f64,
    pub show_scrubber: bool,
    /// Replaces the rendered playhead clock.
    pub clock_text: Option<String>,
    pub total_text: String,
    pub toolbar: Vec<String>,
    pub toolbar_offset: usize,
    pub scene: Vec<Node>,
    pub row_pages: Vec<Vec<Node>>,
    pub row_page: usize,
    pub list_pages: Vec<Vec<Node>>,
    pub list_page: usize,
    pub taps: Vec<Tap>,
    pub swipes: Vec<Swipe>,
    pub inputs: Vec<(String, usize)>,
    last: Snapshot,
}

impl Default for World {
    fn default() -> Self {
        Self {
            playhead: 0.0,
            gain: 0.8,
            max_time: 120.0,
            show_scrubber: true,
            clock_text: None,
            total_text: "0:15.0".into(),
            toolbar: [
                "CANVAS", "Trim", "Split", "Duration", "Speed", "Effect", "Animation", "Audio",
                "Filter", "Text", "Sticker", "Crop",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            toolbar_offset: 0,
            scene: Vec::new(),
            row_pages: Vec::new(),
            row_page: 0,
            list_pages: Vec::new(),
            list_page: 0,
            taps: Vec::new(),
            swipes: Vec::new(),
            inputs: Vec::new(),
            last: Vec::new(),
        }
    }
}

impl World {
    fn render(&mut self) -> Snapshot {
        let mut nodes: Vec<Node> = Vec::new();
        if self.show_scrubber {
            let (x, y) = ORIGIN;
            let half = TRACK_HEIGHT / 2;
            let mut left = x;
            nodes.push(node(
                ids::SCRUBBER_SEGMENT,
                "",
                Bounds::new(300, y - half, x, y + half),
            ));
            for width in [150, 150, 200, 40] {
                nodes.push(node(
                    ids::SCRUBBER_SEGMENT,
                    "",
                    Bounds::new(left, y - half, left + width, y + half),
                ));
                left += width;
            }
        }
        let clock = self
            .clock_text
            .clone()
            .unwrap_or_else(|| format_clock(self.playhead));
        nodes.push(node(
            ids::CURRENT_POSITION,
            &clock,
            Bounds::new(40, 1000, 200, 1040),
        ));
        nodes.push(node(
            ids::TOTAL_DURATION,
            &self.total_text,
            Bounds::new(880, 1000, 1040, 1040),
        ));

        let end = (self.toolbar_offset + TOOLBAR_WINDOW).min(self.toolbar.len());
        for (slot, name) in self.toolbar[self.toolbar_offset..end].iter().enumerate() {
            let left = slot as i32 * 216;
            nodes.push(node(
                ids::TOOLBAR_TITLE,
                name,
                Bounds::new(left, TOOLBAR_Y - 40, left + 216, TOOLBAR_Y + 40),
            ));
        }

        nodes.extend(self.scene.iter().cloned());
        if let Some(page) = self.row_pages.get(self.row_page) {
            nodes.extend(page.iter().cloned());
        }
        if let Some(page) = self.list_pages.get(self.list_page) {
            nodes.extend(page.iter().cloned());
        }

        let snapshot: Snapshot = nodes
            .into_iter()
            .enumerate()
            .map(|(index, n)| UiElement {
                index,
                resource_id: n.id,
                text: n.text,
                bounds: n.bounds,
            })
            .collect();
        self.last = snapshot.clone();
        snapshot
    }

    fn apply_swipe(&mut self, swipe: Swipe) {
        let dx = swipe.to.0 - swipe.from.0;
        let dy = swipe.to.1 - swipe.from.1;
        if dx == 0 && dy < 0 {
            self.list_page = (self.list_page + 1).min(self.list_pages.len().saturating_sub(1));
        } else if swipe.from.1 == ORIGIN.1 && swipe.to.1 == ORIGIN.1 {
            let moved = -(dx as f64) / PIXELS_PER_SECOND * self.gain;
            self.playhead = (self.playhead + moved).clamp(0.0, self.max_time);
        } else if swipe.from.1 == TOOLBAR_Y {
            let last = self.toolbar.len().saturating_sub(TOOLBAR_WINDOW);
            self.toolbar_offset = if dx < 0 {
                (self.toolbar_offset + TOOLBAR_STEP).min(last)
            } else {
                self.toolbar_offset.saturating_sub(TOOLBAR_STEP)
            };
        } else if dx <= -PAGE_FLIP_MIN_PX {
            self.row_page = (self.row_page + 1).min(self.row_pages.len().saturating_sub(1));
        }
    }
}

#[derive(Default)]
pub struct FakeDevice {
    world: Mutex<World>,
    /// Latency of every snapshot, in milliseconds.
    snapshot_delay_ms: AtomicU64,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.world.lock())
    }

    pub fn set_snapshot_delay(&self, ms: u64) {
        self.snapshot_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn taps(&self) -> Vec<Tap> {
        self.world.lock().taps.clone()
    }

    pub fn swipes(&self) -> Vec<Swipe> {
        self.world.lock().swipes.clone()
    }

    pub fn inputs(&self) -> Vec<(String, usize)> {
        self.world.lock().inputs.clone()
    }

    pub fn playhead(&self) -> f64 {
        self.world.lock().playhead
    }

    /// Ids and texts of every element tapped by index, in order.
    pub fn tapped_elements(&self) -> Vec<String> {
        self.taps()
            .into_iter()
            .filter_map(|t| match t {
                Tap::Element { id, text } if id.is_empty() => Some(text),
                Tap::Element { id, .. } => Some(id),
                Tap::Point(..) => None,
            })
            .collect()
    }

    pub fn tapped_points(&self) -> Vec<(i32, i32)> {
        self.taps()
            .into_iter()
            .filter_map(|t| match t {
                Tap::Point(x, y) => Some((x, y)),
                Tap::Element { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeviceControl for FakeDevice {
    async fn snapshot(&self) -> Result<Snapshot, DeviceError> {
        let delay = self.snapshot_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.world.lock().render())
    }

    async fn tap_by_index(&self, index: usize) -> Result<(), DeviceError> {
        let mut world = self.world.lock();
        let el = world
            .last
            .get(index)
            .cloned()
            .ok_or(DeviceError::UnknownIndex(index))?;
        world.taps.push(Tap::Element {
            id: el.resource_id,
            text: el.text,
        });
        Ok(())
    }

    async fn tap_at(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.world.lock().taps.push(Tap::Point(x, y));
        Ok(())
    }

    async fn swipe(&self, from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Result<(), DeviceError> {
        let swipe = Swipe {
            from,
            to,
            duration_ms,
        };
        let mut world = self.world.lock();
        world.swipes.push(swipe);
        world.apply_swipe(swipe);
        Ok(())
    }

    async fn input_text(&self, text: &str, index: usize) -> Result<(), DeviceError> {
        self.world.lock().inputs.push((text.to_string(), index));
        Ok(())
    }
}

pub fn editor(device: Arc<FakeDevice>) -> Editor<Arc<FakeDevice>> {
    let session = SessionContext::open(Box::new(MemoryStore::new())).unwrap();
    Editor::new(
        device,
        session,
        Arc::new(Catalog::builtin()),
        ControlConfig::simulated(),
    )
}

pub async fn calibrated_editor(clips: usize) -> (Arc<FakeDevice>, Editor<Arc<FakeDevice>>) {
    let device = Arc::new(FakeDevice::new());
    let editor = editor(device.clone());
    editor.calibrate(clips).await.unwrap();
    (device, editor)
}

pub fn duration_scene() -> Vec<Node> {
    vec![
        button(ids::BTN_EDIT_DURATION, 900, 1500),
        node(ids::EDIT_TEXT, "5.0", Bounds::new(300, 1400, 780, 1480)),
        button(ids::BTN_OK, 900, 1700),
        button(ids::BTN_APPLY, 1000, 1900),
    ]
}

pub fn transition_scene() -> Vec<Node> {
    vec![
        button(ids::TRANSITION_APPLY, 200, 2000),
        button(ids::TRANSITION_APPLY_ALL, 600, 2000),
        node(
            ids::TRANSITION_APPLY_ALL_CONFIRM,
            "Apply to all",
            Bounds::new(500, 2060, 700, 2100),
        ),
    ]
}

/// Picker row before and after one scroll.
pub fn transition_pages() -> Vec<Vec<Node>> {
    let row = |texts: &[&str]| -> Vec<Node> {
        let mut page = vec![label("BASIC", 20, 1530)];
        for (i, t) in texts.iter().enumerate() {
            page.push(node("", t, Bounds::new(20 + i as i32 * 170, 1600, 180 + i as i32 * 170, 1700)));
        }
        page
    };
    vec![
        row(&["none", "mix", "fade", "blur", "circlefade", "wipe right"]),
        row(&["", "slide left", "slide down", "slide up", "wipe up"]),
    ]
}

pub fn effect_scene() -> Vec<Node> {
    vec![
        button(ids::BTN_ADD_EFFECT, 540, 1450),
        button(ids::BTN_APPLY, 1000, 1900),
        node(ids::EFFECT_CLIP_END, "End", Bounds::new(900, 1350, 1000, 1390)),
        // applied region, then its decoration, then its label
        node("", "", Bounds::new(500, 1400, 700, 1460)),
        node("", "", Bounds::new(505, 1405, 520, 1455)),
        node("", "Darken", Bounds::new(530, 1410, 690, 1450)),
    ]
}

pub fn effect_pages() -> Vec<Vec<Node>> {
    vec![
        vec![
            label("Basic", 20, 1700),
            label("Glitch", 200, 1700),
            label("Film", 380, 1700),
            label("FOCUS", 20, 1820),
            label("ZOOM", 200, 1820),
            label("DARKEN", 380, 1820),
        ],
    ]
}

pub fn animation_scene() -> Vec<Node> {
    vec![
        button(ids::ANIMATION_IN_TAB, 180, 1500),
        button(ids::ANIMATION_OUT_TAB, 540, 1500),
        button(ids::ANIMATION_COMBO_TAB, 900, 1500),
        button(ids::BTN_APPLY, 1000, 1900),
    ]
}

pub fn animation_pages() -> Vec<Vec<Node>> {
    vec![
        vec![
            label("FADE", 20, 1750),
            label("ZOOM IN", 200, 1750),
            label("SHAKE IN", 380, 1750),
        ],
        vec![label("RIPPLE", 20, 1750), label("DISTORT", 200, 1750)],
    ]
}

pub fn music_scene() -> Vec<Node> {
    vec![
        button(ids::BTN_ADD_EFFECT, 540, 1450),
        button(ids::BTN_ADD_TRACK, 300, 1450),
        node(ids::EFFECT_USE, "Use", Bounds::new(900, 800, 1000, 840)),
        node(ids::MUSIC_USE, "Use", Bounds::new(900, 900, 1000, 940)),
        button(ids::BTN_APPLY, 1000, 1900),
    ]
}

pub fn music_pages() -> Vec<Vec<Node>> {
    vec![
        vec![label("Whoosh", 60, 500), label("Pop", 60, 600)],
        vec![label("Thunder", 60, 500), label("audio_7", 60, 600)],
    ]
}

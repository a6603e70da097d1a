use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use timeline::AnimationKind;
use tracing::{debug, info};

use crate::ControlError;

const BUILTIN_TRANSITIONS: [&str; 13] = [
    "none",
    "mix",
    "fade",
    "blur",
    "circlefade",
    "wipe right",
    "wipe left",
    "wipe down",
    "wipe up",
    "slide right",
    "slide left",
    "slide down",
    "slide up",
];

const BUILTIN_EFFECTS: &[(&str, &[&str])] = &[
    ("Basic", &["Slow Zoom", "Zoom Out", "Tremble", "Thrill", "Roll"]),
    ("Glitch", &["Glitch", "Noise", "RGB"]),
    ("Vibrate", &["Strobe", "Flash", "Flow", "Flicker", "Flip", "Leap"]),
    ("Shake", &["Node", "Flutter", "Bass", "Shake", "Cam Shake"]),
    ("Fade", &["White", "Black", "Mosiac"]),
    ("Film", &["Focus", "Zoom", "Darken"]),
    ("Retro", &["REC", "VHS"]),
    ("Blur", &["Circle", "Diamond"]),
    ("Analog", &["Date", "Shorts", "Split"]),
    ("Split", &["Two", "Four", "Nine"]),
    ("Glass", &["Shatter", "Shard"]),
];

const BUILTIN_IN: &[&str] = &[
    "Fade", "Zoom In", "Zoom Out", "Shake In", "Shake Out", "Rise", "Fall", "Slide R", "Slide L",
    "Swing R", "Swing L", "Ripple", "Distort", "Bounce 01", "Bounce 02", "Arrange", "Diagonal",
];

const BUILTIN_OUT: &[&str] = &[
    "Fade", "Zoom In", "Zoom Out", "Slide R", "Slide L", "Slide D", "Slide U", "Swipe R", "Swipe L",
    "Swipe D", "Swipe U", "Ripple", "Distort", "Diagonal",
];

const BUILTIN_COMBO: &[&str] = &[
    "Fall Spin", "Spin Fall", "Sway Zoom", "Zoom Sway", "Swing L", "Swing R", "Fuzz 01", "Fuzz 02",
    "Whip In", "Whip Out", "Stripe In", "Stripe Out", "Trans L", "Trans R",
];

/// Resolved entry of the effect table.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectEntry {
    /// Label exactly as the picker renders it.
    pub name: String,
    pub category: String,
    /// First effect of the same category, visible whenever the category row is.
    pub anchor: String,
}

#[derive(Deserialize)]
struct EffectsFile {
    #[serde(rename = "Effects")]
    effects: serde_json::Map<String, Value>,
}

/// Static lookup tables used by the action protocols. Loaded once per
/// process; misses are reported as [`ControlError::UnknownEntry`].
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Lower-cased transition name to its 1-based position in the picker row.
    transitions: BTreeMap<String, usize>,
    /// (name, category) in picker order.
    effects: Vec<(String, String)>,
    animations: HashMap<AnimationKind, Vec<String>>,
    music: BTreeMap<String, Value>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        let transitions = BUILTIN_TRANSITIONS
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i + 1))
            .collect();
        let effects = BUILTIN_EFFECTS
            .iter()
            .flat_map(|(category, names)| {
                names.iter().map(move |n| (n.to_string(), category.to_string()))
            })
            .collect();
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut animations = HashMap::new();
        animations.insert(AnimationKind::In, owned(BUILTIN_IN));
        animations.insert(AnimationKind::Out, owned(BUILTIN_OUT));
        animations.insert(AnimationKind::Combo, owned(BUILTIN_COMBO));

        Self {
            transitions,
            effects,
            animations,
            music: BTreeMap::new(),
        }
    }

    /// Loads `transitions.json`, `effects.json`, `animations.json` and
    /// `music.json` from `dir`. Tables whose file is absent keep the built-in
    /// contents.
    pub fn load_dir(dir: &Path) -> Result<Self, ControlError> {
        let mut catalog = Self::builtin();

        if let Some(raw) = read_optional(&dir.join("transitions.json"))? {
            let table: BTreeMap<String, usize> = parse(&dir.join("transitions.json"), &raw)?;
            catalog.transitions = table
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect();
        }

        if let Some(raw) = read_optional(&dir.join("effects.json"))? {
            let file: EffectsFile = parse(&dir.join("effects.json"), &raw)?;
            let mut effects = Vec::with_capacity(file.effects.len());
            for (name, category) in file.effects {
                let category = category.as_str().ok_or_else(|| ControlError::Catalog {
                    path: dir.join("effects.json"),
                    reason: format!("category of '{}' is not a string", name),
                })?;
                effects.push((name, category.to_string()));
            }
            catalog.effects = effects;
        }

        if let Some(raw) = read_optional(&dir.join("animations.json"))? {
            let table: HashMap<String, Vec<String>> = parse(&dir.join("animations.json"), &raw)?;
            for (kind, names) in table {
                let kind: AnimationKind = kind.parse().map_err(|reason| ControlError::Catalog {
                    path: dir.join("animations.json"),
                    reason,
                })?;
                catalog.animations.insert(kind, names);
            }
        }

        if let Some(raw) = read_optional(&dir.join("music.json"))? {
            let table: BTreeMap<String, Value> = parse(&dir.join("music.json"), &raw)?;
            catalog.music = table
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect();
        }

        info!(
            "catalog loaded from {:?}: {} transitions, {} effects, {} music entries",
            dir,
            catalog.transitions.len(),
            catalog.effects.len(),
            catalog.music.len()
        );
        Ok(catalog)
    }

    pub fn transition_ordinal(&self, name: &str) -> Result<usize, ControlError> {
        self.transitions
            .get(&name.trim().to_lowercase())
            .copied()
            .ok_or_else(|| unknown("transition", name))
    }

    /// Case-insensitive effect lookup.
    pub fn effect(&self, name: &str) -> Result<EffectEntry, ControlError> {
        let wanted = name.trim().to_lowercase();
        let (real, category) = self
            .effects
            .iter()
            .find(|(n, _)| n.to_lowercase() == wanted)
            .ok_or_else(|| unknown("effect", name))?;
        let anchor = self
            .effects
            .iter()
            .find(|(_, c)| c == category)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| real.clone());
        Ok(EffectEntry {
            name: real.clone(),
            category: category.clone(),
            anchor,
        })
    }

    pub fn animations(&self, kind: AnimationKind) -> &[String] {
        self.animations.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn animation_anchor(&self, kind: AnimationKind) -> Result<&str, ControlError> {
        self.animations(kind)
            .first()
            .map(String::as_str)
            .ok_or_else(|| unknown("animation", kind.as_str()))
    }

    pub fn music_effect(&self, name: &str) -> Option<&Value> {
        self.music.get(&name.trim().to_lowercase())
    }

    /// False for the built-in catalog, which ships no sound names.
    pub fn has_music_table(&self) -> bool {
        !self.music.is_empty()
    }
}

fn unknown(table: &'static str, key: &str) -> ControlError {
    debug!("catalog miss: '{}' in {}", key, table);
    ControlError::UnknownEntry {
        table,
        key: key.to_string(),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ControlError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(catalog_error(path, e)),
    }
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, ControlError> {
    serde_json::from_str(raw).map_err(|e| catalog_error(path, e))
}

fn catalog_error(path: &Path, err: impl std::fmt::Display) -> ControlError {
    ControlError::Catalog {
        path: PathBuf::from(path),
        reason: err.to_string(),
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Seconds, TimelineError, DEFAULT_CLIP_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnimationKind {
    In,
    Out,
    Combo,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 3] = [Self::In, Self::Out, Self::Combo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Combo => "COMBO",
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "COMBO" => Ok(Self::Combo),
            other => Err(format!("unknown animation kind '{}'", other)),
        }
    }
}

/// One instructed edit. Serialized in the planner's `{"tool", "args"}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "args")]
pub enum EditAction {
    #[serde(rename = "change_duration")]
    DurationChange {
        #[serde(rename = "image_idx")]
        clip: usize,
        #[serde(rename = "duration")]
        new_duration: Seconds,
    },
    #[serde(rename = "add_transition")]
    Transition {
        #[serde(rename = "image1_idx")]
        first: usize,
        #[serde(rename = "image2_idx")]
        second: usize,
        #[serde(rename = "transition_type")]
        kind: String,
        #[serde(rename = "all_apply", default)]
        apply_to_all: bool,
    },
    #[serde(rename = "apply_effect")]
    Effect {
        #[serde(rename = "image_idx")]
        clip: usize,
        #[serde(rename = "effects_list")]
        effects: Vec<String>,
    },
    #[serde(rename = "apply_animation")]
    Animation {
        #[serde(rename = "image_idx")]
        clip: usize,
        #[serde(rename = "animation_name")]
        name: String,
        #[serde(rename = "animation_type")]
        kind: AnimationKind,
    },
    #[serde(rename = "add_music_effects")]
    MusicPlacement {
        #[serde(rename = "start_time")]
        at: Seconds,
        #[serde(rename = "music_name")]
        track: String,
    },
    #[serde(rename = "add_background_music")]
    BackgroundMusic {
        #[serde(rename = "audio_name")]
        track: String,
    },
}

impl EditAction {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::DurationChange { .. } => "change_duration",
            Self::Transition { .. } => "add_transition",
            Self::Effect { .. } => "apply_effect",
            Self::Animation { .. } => "apply_animation",
            Self::MusicPlacement { .. } => "add_music_effects",
            Self::BackgroundMusic { .. } => "add_background_music",
        }
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DurationChange { clip, new_duration } => {
                write!(f, "set clip {} to {}s", clip, new_duration)
            }
            Self::Transition {
                first,
                second,
                kind,
                apply_to_all,
            } => {
                write!(f, "'{}' transition {}-{}", kind, first, second)?;
                if *apply_to_all {
                    write!(f, " (all)")?;
                }
                Ok(())
            }
            Self::Effect { clip, effects } => {
                write!(f, "effects [{}] on clip {}", effects.join(", "), clip)
            }
            Self::Animation { clip, name, kind } => {
                write!(f, "{} animation '{}' on clip {}", kind, name, clip)
            }
            Self::MusicPlacement { at, track } => write!(f, "sound '{}' at {}s", track, at),
            Self::BackgroundMusic { track } => write!(f, "background track '{}'", track),
        }
    }
}

/// A planner response. Only the ordered action list matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<String>,
    pub plan: Vec<EditAction>,
}

impl Plan {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Predicts the final video length of `actions` without touching a device:
/// every clip starts at the default duration and each transition removes one
/// second of overlap. An "apply to all" transition covers every junction.
pub fn estimate_plan_duration(
    actions: &[EditAction],
    clip_count: usize,
) -> Result<Seconds, TimelineError> {
    let mut durations = vec![DEFAULT_CLIP_DURATION; clip_count];
    let mut transitions = 0usize;

    for action in actions {
        match action {
            EditAction::DurationChange { clip, new_duration } => {
                let slot = clip
                    .checked_sub(1)
                    .filter(|s| *s < clip_count)
                    .ok_or(TimelineError::ClipOutOfRange {
                        index: *clip,
                        len: clip_count,
                    })?;
                durations[slot] = *new_duration;
            }
            EditAction::Transition { apply_to_all, .. } => {
                if *apply_to_all {
                    transitions = clip_count.saturating_sub(1);
                } else {
                    transitions += 1;
                }
            }
            _ => {}
        }
    }

    Ok(durations.iter().sum::<Seconds>() - transitions as Seconds)
}

//! Resource identifiers of the editor app's views.

macro_rules! view_ids {
    ($($name:ident => $id:literal),* $(,)?) => {
        $(pub const $name: &str = concat!("com.camerasideas.instashot:id/", $id);)*
    };
}

view_ids! {
    SCRUBBER_SEGMENT => "layout",
    CURRENT_POSITION => "current_position",
    TOTAL_DURATION => "total_clips_duration",
    TOOLBAR_TITLE => "title",
    BTN_EDIT_DURATION => "btn_edit_duration",
    EDIT_TEXT => "edit_text",
    BTN_OK => "btn_ok",
    BTN_APPLY => "btn_apply",
    TRANSITION_APPLY => "btnApply",
    TRANSITION_APPLY_ALL => "btnApplyAll",
    TRANSITION_APPLY_ALL_CONFIRM => "applyAllTextView",
    BTN_ADD_EFFECT => "btn_add_effect",
    EFFECT_CLIP_END => "textClipEnd",
    ANIMATION_IN_TAB => "in_text",
    ANIMATION_OUT_TAB => "out_text",
    ANIMATION_COMBO_TAB => "combo_text",
    EFFECT_USE => "effect_use_tv",
    BTN_ADD_TRACK => "btn_add_track",
    MUSIC_USE => "music_use_tv",
}

/// Label marking the left end of the toolbar.
pub const TOOLBAR_START_MARKER: &str = "CANVAS";
/// Hint rendered in the toolbar row that is not a tool.
pub const TOOLBAR_HINT: &str = "Add keyframes for clips";
/// Category label anchoring the transition picker row.
pub const TRANSITION_ANCHOR: &str = "BASIC";
/// Category label always visible at the left of the effect picker.
pub const EFFECT_MENU_ANCHOR: &str = "Basic";

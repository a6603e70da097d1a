//! Bounded, scroll-aware element search.
//!
//! Every search re-fetches the snapshot after each scroll: a scrolled list
//! renders an entirely different set of elements.

use device_io::{find_by_id, DeviceControl, UiElement};
use tracing::{debug, info};

use crate::config::{settle, ControlConfig};
use crate::ids;
use crate::ControlError;

/// Which rows of a horizontal picker a text search may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextArea {
    /// Category labels; any text is eligible.
    Menu,
    /// Item rows; the picker renders item labels fully upper-case, so only
    /// those are eligible.
    Content,
}

impl TextArea {
    fn admits(&self, raw: &str) -> bool {
        match self {
            Self::Menu => true,
            Self::Content => is_upper_case(raw),
        }
    }
}

/// At least one cased character and no lower-case ones.
fn is_upper_case(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Single-snapshot scan by resource id. No scrolling.
pub async fn find_by_resource_id<D>(device: &D, id: &str) -> Result<Option<UiElement>, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let snapshot = device.snapshot().await?;
    Ok(find_by_id(&snapshot, id).cloned())
}

/// Like [`find_by_resource_id`], but absence is an `ElementNotFound`.
pub async fn require_by_resource_id<D>(device: &D, id: &str) -> Result<UiElement, ControlError>
where
    D: DeviceControl + ?Sized,
{
    find_by_resource_id(device, id)
        .await?
        .ok_or_else(|| ControlError::not_found(id))
}

/// Pages horizontally through a picker until an element labelled `target`
/// is visible, then taps it.
///
/// When `anchor` is seen, its row becomes the swipe axis for later pages.
/// Returns `None` once the attempt budget is spent.
pub async fn find_by_text<D>(
    device: &D,
    config: &ControlConfig,
    target: &str,
    anchor: Option<&str>,
    area: TextArea,
) -> Result<Option<UiElement>, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let loc = &config.locator;
    let wanted = normalize(target);
    let anchor = anchor.map(normalize);
    let mut row_y = loc.default_row_y;

    for attempt in 1..=loc.horizontal_attempts {
        let snapshot = device.snapshot().await?;
        for el in snapshot.iter().filter(|el| area.admits(&el.text)) {
            let text = el.normalized_text();
            if anchor.as_deref() == Some(text.as_str()) {
                row_y = el.bounds.center_y();
            }
            if text == wanted {
                info!("found '{}' at index {} (attempt {})", target, el.index, attempt);
                device.tap_by_index(el.index).await?;
                return Ok(Some(el.clone()));
            }
        }

        if attempt == loc.horizontal_attempts {
            break;
        }
        debug!("'{}' not visible, paging row y={}", target, row_y);
        device
            .swipe(
                (loc.row_swipe_from_x, row_y),
                (loc.row_swipe_to_x, row_y),
                loc.swipe_ms,
            )
            .await?;
        settle(config.timings.after_scroll_ms).await;
    }

    info!(
        "'{}' not found after {} attempts",
        target, loc.horizontal_attempts
    );
    Ok(None)
}

/// Scrolls a vertical list until `target` is visible and taps its center.
pub async fn find_by_text_vertical<D>(
    device: &D,
    config: &ControlConfig,
    target: &str,
) -> Result<Option<UiElement>, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let loc = &config.locator;
    let wanted = normalize(target);

    for attempt in 1..=loc.vertical_scrolls {
        let snapshot = device.snapshot().await?;
        if let Some(el) = snapshot.iter().find(|el| el.normalized_text() == wanted) {
            info!("found '{}' at index {} (scroll {})", target, el.index, attempt);
            let (x, y) = el.bounds.center();
            device.tap_at(x, y).await?;
            return Ok(Some(el.clone()));
        }

        if attempt == loc.vertical_scrolls {
            break;
        }
        debug!("'{}' not visible, scrolling down", target);
        device
            .swipe(
                (loc.vertical_scroll_x, loc.vertical_scroll_from_y),
                (loc.vertical_scroll_x, loc.vertical_scroll_to_y),
                loc.swipe_ms,
            )
            .await?;
        settle(config.timings.after_vertical_scroll_ms).await;
    }

    info!("'{}' not found after {} scrolls", target, loc.vertical_scrolls);
    Ok(None)
}

/// Finds a tool in the bottom toolbar. Does not tap it.
///
/// The toolbar keeps its scroll offset between dialogs, so the search first
/// rewinds to the start marker and then scans forward.
pub async fn find_toolbar_item<D>(
    device: &D,
    config: &ControlConfig,
    name: &str,
) -> Result<UiElement, ControlError>
where
    D: DeviceControl + ?Sized,
{
    let loc = &config.locator;
    let wanted = name.trim().to_uppercase();
    let marker = ids::TOOLBAR_START_MARKER.to_uppercase();
    let hint = ids::TOOLBAR_HINT.to_uppercase();
    let mut row_y: Option<i32> = None;

    for _ in 0..loc.toolbar_rewinds {
        let snapshot = device.snapshot().await?;
        let mut at_start = false;
        let mut row_visible = false;

        for el in &snapshot {
            let text = el.text.trim().to_uppercase();
            if text == hint || !el.has_id(ids::TOOLBAR_TITLE) {
                continue;
            }
            row_visible = true;
            row_y.get_or_insert(el.bounds.center_y());
            if text == wanted {
                info!("toolbar '{}' at index {} while rewinding", name, el.index);
                return Ok(el.clone());
            }
            if text == marker {
                at_start = true;
            }
        }

        match row_y {
            _ if at_start => break,
            Some(y) if row_visible => {
                debug!("toolbar start not visible, rewinding");
                device
                    .swipe((loc.row_swipe_to_x, y), (loc.row_swipe_from_x, y), loc.swipe_ms)
                    .await?;
                settle(config.timings.after_scroll_ms).await;
            }
            _ => break,
        }
    }

    for _ in 0..loc.toolbar_swipes {
        let snapshot = device.snapshot().await?;
        for el in snapshot.iter().filter(|el| el.has_id(ids::TOOLBAR_TITLE)) {
            let text = el.text.trim().to_uppercase();
            if text == hint {
                continue;
            }
            row_y.get_or_insert(el.bounds.center_y());
            if text == wanted {
                info!("toolbar '{}' at index {}", name, el.index);
                return Ok(el.clone());
            }
        }

        let y = row_y.ok_or_else(|| ControlError::not_found("toolbar row"))?;
        debug!("toolbar '{}' not visible, scanning forward", name);
        device
            .swipe((loc.row_swipe_from_x, y), (loc.row_swipe_to_x, y), loc.swipe_ms)
            .await?;
        settle(config.timings.after_scroll_ms).await;
    }

    Err(ControlError::not_found(format!("toolbar item '{}'", name)))
}

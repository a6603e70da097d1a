use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Bounds, DeviceError, Snapshot, UiElement};

/// Flattens a `uiautomator dump` hierarchy into a snapshot. Elements are
/// numbered in document order; nodes without text fall back to their
/// content description.
pub fn parse_hierarchy(xml: &str) -> Result<Snapshot, DeviceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out: Snapshot = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"node" => {
                let mut resource_id = String::new();
                let mut text = String::new();
                let mut content_desc = String::new();
                let mut bounds = Bounds::default();

                for attr in e.attributes() {
                    let attr = attr.map_err(|err| DeviceError::Parse(err.to_string()))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|err| DeviceError::Parse(err.to_string()))?;
                    match attr.key.as_ref() {
                        b"resource-id" => resource_id = value.into_owned(),
                        b"text" => text = value.into_owned(),
                        b"content-desc" => content_desc = value.into_owned(),
                        b"bounds" => {
                            bounds = Bounds::parse_bracketed(&value).ok_or_else(|| {
                                DeviceError::Parse(format!("bad bounds '{}'", value))
                            })?
                        }
                        _ => {}
                    }
                }

                if text.is_empty() {
                    text = content_desc;
                }
                out.push(UiElement {
                    index: out.len(),
                    resource_id,
                    text,
                    bounds,
                });
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(DeviceError::Parse(format!(
                    "hierarchy at byte {}: {}",
                    reader.buffer_position(),
                    err
                )))
            }
            _ => {}
        }
    }
    Ok(out)
}

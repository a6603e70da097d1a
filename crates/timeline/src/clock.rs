use crate::{Seconds, TimelineError};

/// Parses the editor's playhead readout (`M:SS.s`, or `H:MM:SS.s` on long
/// timelines) into seconds.
pub fn parse_clock(text: &str) -> Result<Seconds, TimelineError> {
    let malformed = || TimelineError::MalformedClock(text.to_string());
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(malformed());
    }

    let mut total = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let last = i == parts.len() - 1;
        let value: f64 = part.trim().parse().map_err(|_| malformed())?;
        if !value.is_finite() || value < 0.0 || (!last && value.fract() != 0.0) {
            return Err(malformed());
        }
        total = total * 60.0 + value;
    }
    Ok(total)
}

/// Inverse of [`parse_clock`] at the editor's one-decimal resolution.
pub fn format_clock(seconds: Seconds) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    format!("{}:{:02}.{}", minutes, rest / 10, rest % 10)
}

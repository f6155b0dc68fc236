//! Question text normalization.

/// Default cap on question length, in characters.
pub const DEFAULT_MAX_CHARS: usize = 280;

/// Marker prefixed to text that does not already read as a question.
const MARKER: &str = "asks: ";

/// Normalize submitted question text.
///
/// Trims, caps the length at `max_chars` characters, and prefixes `asks: `
/// unless the text already carries the marker or ends with `?`. Applying it
/// twice yields the same string as applying it once.
pub fn normalize(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if has_marker(trimmed) {
        return clamp(trimmed, max_chars);
    }

    let clamped = clamp(trimmed, max_chars);
    if clamped.ends_with('?') {
        return clamped;
    }

    clamp(&format!("{MARKER}{trimmed}"), max_chars)
}

fn has_marker(text: &str) -> bool {
    text.get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("asks:"))
}

/// Keep at most `max_chars` characters, then drop trailing whitespace.
fn clamp(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.trim_end().to_string(),
    }
}

/// Crop `content` to at most `max_chars` characters.
///
/// Returns the cropped text and whether anything was removed. Cuts on a
/// `char` boundary, never inside a code point.
pub fn crop_chars(content: &str, max_chars: usize) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (content[..byte_idx].to_string(), true),
        None => (content.to_string(), false),
    }
}

/// Keep only the first line of `content`, cropped to `max_chars` with a
/// trailing `...` when it was longer.
pub fn first_line_ellipsis(content: &str, max_chars: usize) -> String {
    let line = content.lines().next().unwrap_or_default();
    match crop_chars(line, max_chars) {
        (cropped, true) => format!("{cropped}..."),
        (whole, false) => whole,
    }
}

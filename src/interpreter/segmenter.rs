const BULLET: char = '•';

/// Splits free text into statements on line breaks and bullet glyphs.
pub fn segment(text: &str) -> Vec<String> {
    text.split(|c| c == '\n' || c == '\r' || c == BULLET)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

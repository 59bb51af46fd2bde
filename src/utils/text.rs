//! Text processing utilities.

/// First `max_chars` characters followed by `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

/// Number of characters, not bytes.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

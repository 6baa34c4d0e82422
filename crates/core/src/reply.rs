//! Cleanup applied to text-model replies before delivery.

use std::sync::LazyLock;

use regex::Regex;

/// Chat platforms reject messages longer than this many characters.
pub const MAX_REPLY_CHARS: usize = 2000;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex is valid"));

/// Strip `<think>` reasoning blocks and surrounding whitespace.
pub fn clean_reply(raw: &str) -> String {
    THINK_BLOCK.replace_all(raw, "").trim().to_string()
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

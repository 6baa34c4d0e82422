//! Blocked-subject screening for prompts.
//!
//! Terms match on word boundaries, so "teen" is caught in "teens" but
//! not in "canteen". Plural forms (`s`, `ies`, and `y` -> `ies`) are
//! covered by the same pattern.

use std::sync::LazyLock;

use regex::Regex;

/// Subjects that are never queued, for either job kind.
pub const BLOCKED_TERMS: &[&str] = &[
    "child", "kid", "minor", "baby", "toddler", "teen", "infant", "newborn", "tyke", "kiddo",
    "preteen", "tween", "babe", "fetus", "cub", "tot", "little one", "schoolgirl", "schoolboy",
    "underage", "youth", "junior", "adolescent", "loli", "shota", "chibi", "petit", "petite",
    "jailbait", "rape", "noncon", "gore", "necro", "beheading", "bestiality",
];

static BLOCKED: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = BLOCKED_TERMS.iter().map(|t| term_pattern(t)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("blocked-term regex is valid")
});

fn term_pattern(term: &str) -> String {
    let escaped = regex::escape(term);
    match term.strip_suffix('y') {
        Some(stem) => format!("{escaped}(?:s|ies)?|{}ies", regex::escape(stem)),
        None => format!("{escaped}(?:s|ies)?"),
    }
}

/// Return the first blocked term found in `text`, if any.
pub fn find_blocked_term(text: &str) -> Option<String> {
    BLOCKED
        .find(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
}

/// `true` when `text` contains no blocked term.
///
/// Empty input is admissible; callers reject emptiness on their own.
pub fn is_admissible(text: &str) -> bool {
    find_blocked_term(text).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_prompt_is_admissible() {
        assert!(is_admissible("a beautiful sunset"));
    }

    #[test]
    fn blocked_subject_is_rejected() {
        assert!(!is_admissible("photo of a toddler"));
        assert!(!is_admissible("Show me a TODDLER"));
    }

    #[test]
    fn matches_on_word_boundaries_only() {
        assert!(is_admissible("CANTEEN meeting"));
        assert!(is_admissible("a kidney bean salad"));
        assert!(is_admissible("tottenham stadium"));
    }

    #[test]
    fn plural_forms_are_blocked() {
        assert!(!is_admissible("two teens talking"));
        assert!(!is_admissible("a room full of babies"));
        assert!(!is_admissible("wolf cubs"));
    }

    #[test]
    fn multi_word_terms_are_blocked() {
        assert!(!is_admissible("a little one playing"));
    }

    #[test]
    fn empty_input_is_admissible() {
        assert!(is_admissible(""));
        assert!(is_admissible("   "));
    }

    #[test]
    fn reports_the_matched_term() {
        assert_eq!(find_blocked_term("Gore everywhere").as_deref(), Some("gore"));
        assert_eq!(find_blocked_term("sunset"), None);
    }
}

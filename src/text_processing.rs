//! # Text Processing Module
//!
//! Text utilities for group-chat moderation: punctuation stripping and the
//! restricted-word list loaded from a newline/comma separated file.

use std::collections::HashSet;
use std::fs;

/// Strip ASCII punctuation so "w.o.r.d" matches "word"
pub fn clean_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

/// Load the restricted-word set.
///
/// Words are separated by commas and/or newlines and compared
/// case-insensitively. A missing file simply disables moderation.
pub fn load_restricted_words(file_path: &str) -> HashSet<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => content
            .lines()
            .flat_map(|line| line.split(','))
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect(),
        Err(_) => HashSet::new(),
    }
}

/// Whether any word of `text` is on the restricted list
pub fn contains_restricted_word(text: &str, restricted: &HashSet<String>) -> bool {
    if restricted.is_empty() {
        return false;
    }

    clean_text(&text.to_lowercase())
        .split_whitespace()
        .any(|word| restricted.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_clean_text_strips_punctuation() {
        assert_eq!(clean_text("h.e-l,l!o"), "hello");
        assert_eq!(clean_text("no punctuation"), "no punctuation");
    }

    #[test]
    fn test_contains_restricted_word() {
        let restricted = word_set(&["spam", "scam"]);

        assert!(contains_restricted_word("buy my SPAM now", &restricted));
        assert!(contains_restricted_word("s.p.a.m offer", &restricted));
        assert!(!contains_restricted_word("perfectly fine message", &restricted));
        // Substrings do not count, only whole words
        assert!(!contains_restricted_word("spammy", &restricted));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        assert!(!contains_restricted_word("spam", &HashSet::new()));
    }

    #[test]
    fn test_missing_file_yields_empty_set() {
        assert!(load_restricted_words("/nonexistent/words.txt").is_empty());
    }
}

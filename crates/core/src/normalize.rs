//! Text normalization for slide labels and captions.
//!
//! Slide text keeps its words and punctuation; only the characters that
//! break single-line labels are folded away.

use crate::patterns::BREAKS_REGEX;
use unicode_normalization::UnicodeNormalization;

/// Normalize a shape's raw text into a single-line label.
///
/// - Composes the text to Unicode NFC
/// - Folds each run of line feeds, carriage returns, vertical tabs and
///   non-breaking spaces into one space
/// - Trims leading/trailing whitespace
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    BREAKS_REGEX
        .replace_all(composed.trim(), " ")
        .trim()
        .to_string()
}

/// Keep at most `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! String utilities
//!
//! Helpers for safe truncation of model output before it is embedded
//! in fallback payloads or log lines.

/// Truncate a string to at most `max_chars` characters.
///
/// Truncation happens at a character boundary, so multi-byte UTF-8
/// sequences in model output are never split.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string and append `suffix` if anything was cut off.
///
/// Used when a raw upstream payload has to be embedded in a fallback
/// response without growing unboundedly.
pub fn truncate_with_suffix(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}{}", truncate_str(s, max_chars), suffix)
    }
}

//! UTF-8-safe clipping for log notes and previews.
//!
//! Byte-indexed truncation panics when the cut lands inside a multi-byte
//! character, so clipping always snaps back to a char boundary.

/// The longest prefix of `s` that is at most `max_bytes` long and does not
/// split a character.
#[must_use]
pub fn clip_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Clip `s` to `max_bytes` and append a marker when anything was removed.
///
/// The marker does not count against the budget; callers that need a strict
/// total length should budget for it.
#[must_use]
pub fn excerpt(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let prefix = clip_utf8(s, max_bytes);
    format!("{prefix}… [{} bytes total]", s.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

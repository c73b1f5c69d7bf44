//! Locating a JSON payload inside free-form model output.
//!
//! Models asked for JSON frequently wrap it in prose or code fences. The
//! extractor is deliberately conservative: a `None` result means "could not
//! extract" and must never be coerced into an empty object downstream.

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Extract the JSON payload embedded in `text`, if there is exactly one.
///
/// Ordered rules, first match wins:
///
/// 1. Two or more ```` ```json ```` fences: ambiguous, refuse.
/// 2. Exactly one fence: take its interior.
/// 3. A `{` … `}` span whose opener precedes any `[`: slice it.
/// 4. A `[` … `]` span: slice it.
///
/// The candidate is validated by parsing; anything that does not parse as
/// JSON yields `None`.
#[must_use]
pub fn extract_json(text: &str) -> Option<String> {
    let candidate = candidate_span(text)?;
    let trimmed = candidate.trim();
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        Some(trimmed.to_owned())
    } else {
        None
    }
}

/// Pick the single candidate span per the ordered rules. No validation here.
fn candidate_span(text: &str) -> Option<&str> {
    let fences = fenced_blocks(text);
    match fences.len() {
        0 => {}
        1 => return Some(fences[0]),
        _ => return None,
    }

    // No fence: the earliest opener is the top-level structure; the other
    // bracket kind, if present later, is nested inside it.
    let brace = text.find('{');
    let bracket = text.find('[');
    match (brace, bracket) {
        (Some(b), Some(k)) if b < k => span(text, b, '}'),
        (Some(b), None) => span(text, b, '}'),
        (_, Some(k)) => span(text, k, ']'),
        (None, None) => None,
    }
}

/// Slice from `open` to the last occurrence of `close`, inclusive.
fn span(text: &str, open: usize, close: char) -> Option<&str> {
    let end = text.rfind(close)?;
    if end < open {
        return None;
    }
    Some(&text[open..=end])
}

/// Interiors of every ```` ```json ```` fenced block, in order.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(FENCE_OPEN) {
        let body = &rest[start + FENCE_OPEN.len()..];
        let Some(end) = body.find(FENCE_CLOSE) else {
            break;
        };
        blocks.push(&body[..end]);
        rest = &body[end + FENCE_CLOSE.len()..];
    }
    blocks
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

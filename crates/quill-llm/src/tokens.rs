//! Request-independent token estimation.
//!
//! Used for context-size decisions, not billing; the provider's reported
//! usage is the ground truth after a call. Models outside the known families
//! estimate `0` — an explicit degradation, not an error — which disables
//! token-threshold logic rather than failing the caller.

/// Average bytes per token for the supported model families.
pub const CHARS_PER_TOKEN: u32 = 4;

/// Model-family prefixes with a usable estimator.
const KNOWN_FAMILIES: &[&str] = &["gpt-", "chatgpt-", "o1", "o3", "o4", "claude-", "gigachat"];

/// Whether a tokenizer estimate exists for `model`.
#[must_use]
pub fn is_known_model(model: &str) -> bool {
    let lower = model.to_ascii_lowercase();
    KNOWN_FAMILIES.iter().any(|family| lower.starts_with(family))
}

/// Estimate the token count of `text` for `model`.
///
/// Unknown models return `0`.
#[must_use]
pub fn count_tokens(model: &str, text: &str) -> u32 {
    if !is_known_model(model) {
        return 0;
    }
    estimate_bytes(text.len())
}

/// Estimate the token count of `total_bytes` of content.
#[must_use]
pub fn estimate_bytes(total_bytes: usize) -> u32 {
    total_bytes.div_ceil(CHARS_PER_TOKEN as usize) as u32
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_families() {
        assert!(is_known_model("gpt-4o-mini"));
        assert!(is_known_model("GPT-4o"));
        assert!(is_known_model("chatgpt-4o-latest"));
        assert!(is_known_model("o3-mini"));
        assert!(is_known_model("claude-sonnet-4-20250514"));
        assert!(is_known_model("GigaChat-Pro"));
    }

    #[test]
    fn unknown_families() {
        assert!(!is_known_model("llama-3-70b"));
        assert!(!is_known_model(""));
    }

    #[test]
    fn counts_round_up() {
        assert_eq!(count_tokens("gpt-4o-mini", ""), 0);
        assert_eq!(count_tokens("gpt-4o-mini", "abc"), 1);
        assert_eq!(count_tokens("gpt-4o-mini", "abcd"), 1);
        assert_eq!(count_tokens("gpt-4o-mini", "abcde"), 2);
    }

    #[test]
    fn unknown_model_degrades_to_zero() {
        assert_eq!(count_tokens("llama-3-70b", "a very long text indeed"), 0);
    }

    #[test]
    fn estimate_bytes_matches_count() {
        let text = "x".repeat(1000);
        assert_eq!(count_tokens("gpt-4o", &text), estimate_bytes(1000));
        assert_eq!(estimate_bytes(1000), 250);
    }
}

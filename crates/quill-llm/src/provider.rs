//! The provider seam: one request, one completion.
//!
//! Quill deliberately avoids streaming — every interaction is "send an
//! ordered list of role-tagged messages, receive one completion". Providers
//! report token usage with each completion so the gateway can account for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quill_core::messages::ChatMessage;

/// Structured-output hint for providers that support one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free text (the default).
    Text,
    /// Ask the provider to emit a JSON object.
    JsonObject,
}

/// Per-request options. Defaults mean "free-text completion".
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Sampling temperature override.
    pub temperature: Option<f64>,
    /// Structured-output hint.
    pub response_format: Option<ResponseFormat>,
    /// Output token cap override.
    pub max_tokens: Option<u32>,
}

/// Token counters for one call, as reported by the provider.
///
/// Fields default to zero so partially populated provider payloads still
/// deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    /// Tokens in the generated completion.
    pub completion_tokens: u64,
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Prompt plus completion.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.completion_tokens += other.completion_tokens;
        self.prompt_tokens += other.prompt_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One generated completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated text.
    pub text: String,
    /// Usage counters for the call.
    pub usage: TokenUsage,
}

/// Failure modes of the completion gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or protocol failure before a response body was obtained.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered but returned no usable choices.
    #[error("provider returned no completion")]
    EmptyResponse,
    /// Non-success HTTP status with a parsed provider message.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message, or the raw body when unparseable.
        message: String,
        /// Whether a retry could plausibly succeed.
        retryable: bool,
    },
    /// HTTP 429 with the provider's suggested backoff.
    #[error("rate limited (retry after {retry_after_ms}ms): {message}")]
    RateLimited {
        /// Suggested backoff in milliseconds, `0` when not provided.
        retry_after_ms: u64,
        /// Provider error message.
        message: String,
    },
    /// Credentials could not be turned into a valid header.
    #[error("auth: {message}")]
    Auth {
        /// What went wrong.
        message: String,
    },
}

/// A chat-completion transport.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The model this provider is configured for.
    fn model(&self) -> &str;

    /// Send `messages` and return one completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, GatewayError>;
}

/// Parse a `Retry-After` header value (whole seconds) into milliseconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|secs| secs * 1000)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_add_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage {
            completion_tokens: 5,
            prompt_tokens: 10,
            total_tokens: 15,
        });
        total.add(TokenUsage {
            completion_tokens: 1,
            prompt_tokens: 2,
            total_tokens: 3,
        });
        assert_eq!(total.completion_tokens, 6);
        assert_eq!(total.prompt_tokens, 12);
        assert_eq!(total.total_tokens, 18);
    }

    #[test]
    fn usage_round_trips() {
        let usage = TokenUsage {
            completion_tokens: 1,
            prompt_tokens: 2,
            total_tokens: 3,
        };
        let json = serde_json::to_string(&usage).unwrap();
        let back: TokenUsage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, usage);
    }

    #[test]
    fn retry_after_parses_seconds() {
        assert_eq!(parse_retry_after("2"), Some(2000));
        assert_eq!(parse_retry_after(" 10 "), Some(10_000));
    }

    #[test]
    fn retry_after_rejects_garbage() {
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn options_default_is_free_text() {
        let options = CompletionOptions::default();
        assert!(options.temperature.is_none());
        assert!(options.response_format.is_none());
        assert!(options.max_tokens.is_none());
    }
}

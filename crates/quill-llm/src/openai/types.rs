//! OpenAI-compatible provider types and configuration.
//!
//! Covers the classic chat-completions endpoint; any server speaking that
//! dialect (including self-hosted gateways) works via `base_url`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::provider::{ResponseFormat, TokenUsage};
use quill_core::messages::ChatMessage;

/// Default base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Provider authentication.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAiAuth {
    /// Bearer API key.
    #[serde(rename = "api_key")]
    ApiKey {
        /// The key value.
        api_key: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Provider configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// Model ID.
    pub model: String,
    /// Authentication.
    pub auth: OpenAiAuth,
    /// Base URL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

/// One role-tagged message on the wire.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    /// `system`, `user`, or `assistant`.
    pub role: &'static str,
    /// Message body.
    pub content: &'a str,
}

/// A chat-completions request body.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    /// Model ID.
    pub model: &'a str,
    /// Ordered messages.
    pub messages: Vec<WireMessage<'a>>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Structured-output hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

/// Convert messages to the wire shape (borrowing, no copies).
#[must_use]
pub fn to_wire(messages: &[ChatMessage]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

/// Render a [`ResponseFormat`] hint as the provider expects it.
#[must_use]
pub fn format_hint(format: ResponseFormat) -> Option<Value> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => Some(json!({"type": "json_object"})),
    }
}

/// A chat-completions response body (the fields Quill reads).
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Generated choices; Quill uses the first.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Usage counters; absent on some compatible servers.
    pub usage: Option<TokenUsage>,
}

/// One generated choice.
#[derive(Debug, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: ChoiceMessage,
}

/// The message inside a choice.
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    /// Generated text; may be absent or empty.
    pub content: Option<String>,
}

/// The error envelope in a non-2xx body.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    /// The error payload.
    pub error: Option<ErrorBody>,
}

/// The provider's error payload.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub message: Option<String>,
}

/// Extract the provider's error message from a raw body.
///
/// Falls back to the (clipped) raw body when the envelope is unparseable.
#[must_use]
pub fn parse_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.error.and_then(|e| e.message) {
            return message;
        }
    }
    quill_core::text::clip_utf8(body, 200).to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_wire_preserves_roles_and_order() {
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("question"),
            ChatMessage::assistant("answer"),
        ];
        let wire = to_wire(&messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
        assert_eq!(wire[1].content, "question");
    }

    #[test]
    fn format_hint_json_object() {
        let hint = format_hint(ResponseFormat::JsonObject).unwrap();
        assert_eq!(hint["type"], "json_object");
    }

    #[test]
    fn format_hint_text_is_absent() {
        assert!(format_hint(ResponseFormat::Text).is_none());
    }

    #[test]
    fn request_skips_absent_options() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn response_parses_minimal_body() {
        let body = r#"{"choices":[{"message":{"content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn response_parses_usage() {
        let body = r#"{"choices":[],"usage":{"completion_tokens":5,"prompt_tokens":7,"total_tokens":12}}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.total_tokens, 12);
    }

    #[test]
    fn error_message_from_envelope() {
        let body = r#"{"error":{"message":"model overloaded"}}"#;
        assert_eq!(parse_error_message(body), "model overloaded");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(parse_error_message("<html>503</html>"), "<html>503</html>");
    }
}

//! OpenAI-compatible chat-completions provider.
//!
//! One non-streaming POST per completion. Bearer auth, JSON body, and the
//! provider's error envelope parsed out of non-2xx responses. 429 is mapped
//! to [`GatewayError::RateLimited`] with the `Retry-After` header when
//! present.

pub mod types;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error, instrument};

use crate::provider::{
    Completion, CompletionOptions, GatewayError, Provider, parse_retry_after,
};
use quill_core::messages::ChatMessage;

pub use types::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiAuth, OpenAiConfig};

use types::{ChatRequest, ChatResponse, format_hint, parse_error_message, to_wire};

/// OpenAI-compatible LLM provider.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a new provider.
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new provider with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Build HTTP headers for the request.
    fn build_headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &self.config.auth {
            OpenAiAuth::ApiKey { api_key } => {
                let value = format!("Bearer {api_key}");
                let _ = headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&value).map_err(|e| GatewayError::Auth {
                        message: format!("invalid API key header: {e}"),
                    })?,
                );
            }
        }

        Ok(headers)
    }

    /// Build the request body. Options override the config temperature.
    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &CompletionOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: to_wire(messages),
            temperature: options.temperature.or(self.config.temperature),
            max_tokens: options.max_tokens,
            response_format: options.response_format.and_then(format_hint),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, GatewayError> {
        let request = self.build_request(messages, options);
        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base_url}/chat/completions");
        let headers = self.build_headers()?;

        debug!(
            message_count = request.messages.len(),
            has_format_hint = request.response_format.is_some(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body);
            error!(status = status.as_u16(), message, "completion request failed");
            if status.as_u16() == 429 {
                return Err(GatewayError::RateLimited {
                    retry_after_ms: retry_after.unwrap_or(0),
                    message,
                });
            }
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
                retryable: status.is_server_error(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let usage = parsed.usage.unwrap_or_default();
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(GatewayError::EmptyResponse);
        };
        let text = choice.message.content.unwrap_or_default();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        debug!(
            completion_tokens = usage.completion_tokens,
            prompt_tokens = usage.prompt_tokens,
            "completion received"
        );

        Ok(Completion { text, usage })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResponseFormat;

    fn test_config() -> OpenAiConfig {
        OpenAiConfig {
            model: "gpt-4o-mini".into(),
            auth: OpenAiAuth::ApiKey {
                api_key: "test-key".into(),
            },
            base_url: None,
            temperature: None,
        }
    }

    // ── Provider metadata ───────────────────────────────────────────────

    #[test]
    fn model_returns_config_model() {
        let provider = OpenAiProvider::new(test_config());
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    // ── Headers ─────────────────────────────────────────────────────────

    #[test]
    fn headers_has_bearer_auth() {
        let provider = OpenAiProvider::new(test_config());
        let headers = provider.build_headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer test-key");
    }

    #[test]
    fn headers_has_content_type() {
        let provider = OpenAiProvider::new(test_config());
        let headers = provider.build_headers().unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn headers_reject_control_chars_in_key() {
        let mut config = test_config();
        config.auth = OpenAiAuth::ApiKey {
            api_key: "bad\nkey".into(),
        };
        let provider = OpenAiProvider::new(config);
        assert!(matches!(
            provider.build_headers(),
            Err(GatewayError::Auth { .. })
        ));
    }

    // ── Request building ────────────────────────────────────────────────

    #[test]
    fn request_uses_options_temperature_over_config() {
        let mut config = test_config();
        config.temperature = Some(0.3);
        let provider = OpenAiProvider::new(config);
        let messages = vec![ChatMessage::user("hi")];

        let options = CompletionOptions {
            temperature: Some(0.9),
            ..CompletionOptions::default()
        };
        let request = provider.build_request(&messages, &options);
        assert_eq!(request.temperature, Some(0.9));

        let request = provider.build_request(&messages, &CompletionOptions::default());
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn request_carries_json_hint() {
        let provider = OpenAiProvider::new(test_config());
        let messages = vec![ChatMessage::user("hi")];
        let options = CompletionOptions {
            response_format: Some(ResponseFormat::JsonObject),
            ..CompletionOptions::default()
        };
        let request = provider.build_request(&messages, &options);
        assert_eq!(request.response_format.unwrap()["type"], "json_object");
    }

    #[test]
    fn request_default_is_free_text() {
        let provider = OpenAiProvider::new(test_config());
        let messages = vec![ChatMessage::user("hi")];
        let request = provider.build_request(&messages, &CompletionOptions::default());
        assert!(request.response_format.is_none());
        assert!(request.temperature.is_none());
        assert!(request.max_tokens.is_none());
    }
}

//! Shared test utilities for gateway and engine tests.
//!
//! [`ScriptedProvider`] replays a queue of canned responses and records every
//! request it receives, so tests can assert both outcomes and the exact
//! message sequences that were sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::provider::{Completion, CompletionOptions, GatewayError, Provider, TokenUsage};
use quill_core::messages::ChatMessage;

/// One canned response.
enum Scripted {
    Text(String),
    EmptyResponse,
    Api { status: u16, message: String },
}

/// In-process provider fake that replays canned responses in order.
///
/// When the script runs dry, further calls return
/// [`GatewayError::EmptyResponse`].
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

/// Fixed usage attached to every scripted text response.
#[must_use]
pub fn scripted_usage() -> TokenUsage {
    TokenUsage {
        completion_tokens: 5,
        prompt_tokens: 10,
        total_tokens: 15,
    }
}

impl ScriptedProvider {
    /// Create a provider for `model` with an empty script.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Builder: queue a text response.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.responses.lock().push_back(Scripted::Text(text.into()));
        self
    }

    /// Builder: queue an empty-response failure.
    #[must_use]
    pub fn with_empty_response(self) -> Self {
        self.responses.lock().push_back(Scripted::EmptyResponse);
        self
    }

    /// Builder: queue an API error.
    #[must_use]
    pub fn with_api_error(self, status: u16, message: impl Into<String>) -> Self {
        self.responses.lock().push_back(Scripted::Api {
            status,
            message: message.into(),
        });
        self
    }

    /// Queue a text response after construction.
    pub fn push_text(&self, text: impl Into<String>) {
        self.responses.lock().push_back(Scripted::Text(text.into()));
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<Completion, GatewayError> {
        self.calls.lock().push(messages.to_vec());
        match self.responses.lock().pop_front() {
            Some(Scripted::Text(text)) => Ok(Completion {
                text,
                usage: scripted_usage(),
            }),
            Some(Scripted::Api { status, message }) => Err(GatewayError::Api {
                status,
                message,
                retryable: status >= 500,
            }),
            Some(Scripted::EmptyResponse) | None => Err(GatewayError::EmptyResponse),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

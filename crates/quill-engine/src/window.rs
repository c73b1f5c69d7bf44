//! Context-window compaction.
//!
//! When the conversation exceeds both a message-count threshold and a token
//! threshold, the oldest fixed-size slice is removed, summarized with one
//! gateway call, and replaced by a single synthetic `system` message. The
//! replacement is lossy and one-way; if the summary call fails, the slice is
//! restored and compaction waits for a later iteration, so messages are never
//! silently lost.
//!
//! Compaction is evaluated once per command iteration and before every
//! batch-proposing model call — never mid-command.

use quill_core::messages::{ChatMessage, ConversationLog};
use quill_llm::{CompletionGateway, CompletionOptions};
use tracing::{info, warn};

use crate::prompts;

/// Compaction thresholds.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Message-count threshold; the log must be strictly larger.
    pub max_messages: usize,
    /// Token-estimate threshold; the log must be strictly larger.
    pub token_budget: u32,
    /// How many of the oldest messages one compaction removes.
    pub slice_size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_messages: 40,
            token_budget: 45_000,
            slice_size: 10,
        }
    }
}

impl From<&quill_settings::WindowSettings> for WindowConfig {
    fn from(settings: &quill_settings::WindowSettings) -> Self {
        Self {
            max_messages: settings.max_messages,
            token_budget: settings.token_budget,
            slice_size: settings.slice_size,
        }
    }
}

/// Keeps a conversation log under its size budget.
pub struct ContextWindow {
    config: WindowConfig,
}

impl ContextWindow {
    /// Create a window with the given thresholds.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Whether a log of this size needs compaction. Both thresholds must be
    /// exceeded.
    #[must_use]
    pub fn needs_compaction(&self, message_count: usize, token_estimate: u32) -> bool {
        message_count > self.config.max_messages && token_estimate > self.config.token_budget
    }

    /// Compact `log` if it exceeds both thresholds. Returns whether a slice
    /// was summarized.
    pub async fn maybe_compact(&self, gateway: &CompletionGateway, log: &mut ConversationLog) -> bool {
        let tokens = gateway.count_log_tokens(log);
        if !self.needs_compaction(log.len(), tokens) {
            return false;
        }

        let slice = log.drain_front(self.config.slice_size);
        let slice_json = match serde_json::to_string(&slice) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "could not serialize slice, restoring");
                log.prepend_all(slice);
                return false;
            }
        };

        let request = vec![ChatMessage::system(prompts::summary_request(&slice_json))];
        match gateway.complete(&request, &CompletionOptions::default()).await {
            Ok(completion) => {
                log.prepend(ChatMessage::system(prompts::summary_note(&completion.text)));
                info!(
                    removed = slice.len(),
                    tokens_before = tokens,
                    tokens_after = gateway.count_log_tokens(log),
                    "compacted context window"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "summary call failed, restoring slice");
                log.prepend_all(slice);
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! The completion gateway: a provider plus the usage ledger.
//!
//! Every successful completion adds its usage to the ledger and flushes it.
//! A ledger write failure never voids a completion the provider already
//! charged for; it is logged and the completion is returned.

use std::sync::Arc;

use tracing::{debug, error};

use crate::provider::{Completion, CompletionOptions, GatewayError, Provider};
use crate::tokens;
use crate::usage::UsageLedger;
use quill_core::messages::{ChatMessage, ConversationLog};

/// Gateway to the configured LLM.
pub struct CompletionGateway {
    provider: Arc<dyn Provider>,
    ledger: Arc<UsageLedger>,
}

impl CompletionGateway {
    /// Create a gateway over `provider`, accounting into `ledger`.
    pub fn new(provider: Arc<dyn Provider>, ledger: Arc<UsageLedger>) -> Self {
        Self { provider, ledger }
    }

    /// The model every call goes to.
    #[must_use]
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Send `messages` and return one completion, recording usage on success.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, GatewayError> {
        let completion = self.provider.complete(messages, options).await?;
        if let Err(e) = self
            .ledger
            .record_and_flush(self.provider.model(), completion.usage)
        {
            error!(error = %e, "failed to persist usage counters");
        }
        debug!(
            total_tokens = completion.usage.total_tokens,
            "completion accounted"
        );
        Ok(completion)
    }

    /// Estimate the token count of `text` for this gateway's model.
    ///
    /// Independent of any request; `0` when no estimator exists.
    #[must_use]
    pub fn count_tokens(&self, text: &str) -> u32 {
        tokens::count_tokens(self.provider.model(), text)
    }

    /// Estimate the token count of an entire conversation log.
    ///
    /// Contents are summed before estimation, matching how the log would be
    /// concatenated into a prompt.
    #[must_use]
    pub fn count_log_tokens(&self, log: &ConversationLog) -> u32 {
        if !tokens::is_known_model(self.provider.model()) {
            return 0;
        }
        tokens::estimate_bytes(log.content_bytes())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

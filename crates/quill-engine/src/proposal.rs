//! Proposing a new command batch, with recovery.
//!
//! One LLM call plus JSON extraction form a single retryable unit: malformed
//! output triggers a fresh generation, not a re-parse of the same bad text.
//! Once every attempt has produced unextractable output, a single extra call
//! asks the model to reformat its previous answer into strict JSON — content
//! unchanged — before [`EngineError::Extraction`] is surfaced.

use thiserror::Error;
use tracing::debug;

use quill_core::command::{Command, parse_batch};
use quill_core::extract::extract_json;
use quill_core::messages::{ChatMessage, ConversationLog};
use quill_core::retry::retry;
use quill_llm::{CompletionOptions, GatewayError};

use crate::errors::EngineError;
use crate::interpreter::Interpreter;
use crate::prompts;

/// Failure of one generate-and-extract attempt.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("response contained no valid command JSON")]
    BadJson { raw: String },
}

impl Interpreter {
    /// Propose a new command batch from the running log plus a fresh
    /// file-index snapshot.
    pub(crate) async fn propose_batch(
        &self,
        log: &ConversationLog,
    ) -> Result<Vec<Command>, EngineError> {
        let mut messages = Vec::with_capacity(log.len() + 2);
        messages.push(ChatMessage::system(format!(
            "These are the project files known so far:\n{}",
            self.file_synopsis()
        )));
        messages.extend(log.messages().iter().cloned());
        messages.push(ChatMessage::system(prompts::COMMAND_SCHEMA));

        let this = self;
        let request: &[ChatMessage] = &messages;
        let result = retry(self.retry_attempts(), move |_| async move {
            this.throttle().await;
            let completion = this
                .gateway()
                .complete(request, &CompletionOptions::default())
                .await
                .map_err(AttemptError::Gateway)?;
            parse_commands(&completion.text).ok_or(AttemptError::BadJson {
                raw: completion.text,
            })
        })
        .await;

        match result {
            Ok(batch) => Ok(batch),
            Err(exhausted) => match exhausted.into_source() {
                AttemptError::BadJson { raw } => self.reformat_recovery(raw).await,
                AttemptError::Gateway(e) => Err(e.into()),
            },
        }
    }

    /// The secondary recovery path: one call whose sole instruction is
    /// "reformat your previous answer to valid JSON".
    async fn reformat_recovery(&self, raw: String) -> Result<Vec<Command>, EngineError> {
        debug!("asking the model to reformat its previous answer");
        let messages = vec![
            ChatMessage::assistant(raw),
            ChatMessage::user(prompts::REFORMAT),
        ];
        self.throttle().await;
        let completion = self
            .gateway()
            .complete(&messages, &CompletionOptions::default())
            .await?;
        parse_commands(&completion.text).ok_or(EngineError::Extraction)
    }
}

/// Extract and parse a command batch; `None` means "could not extract".
fn parse_commands(text: &str) -> Option<Vec<Command>> {
    let json = extract_json(text)?;
    parse_batch(&json).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands_fenced_batch() {
        let text = "```json\n[{\"type\":\"meta-command\",\"action\":\"terminate\"}]\n```";
        let batch = parse_commands(text).unwrap();
        assert_eq!(batch, vec![Command::terminate()]);
    }

    #[test]
    fn parse_commands_bare_array() {
        let text = "[{\"type\":\"info-command\",\"action\":\"need-info\",\"prompt\":\"q\"}]";
        assert_eq!(parse_commands(text).unwrap().len(), 1);
    }

    #[test]
    fn parse_commands_prose_refused() {
        assert!(parse_commands("I think we should create a file").is_none());
    }

    #[test]
    fn parse_commands_valid_json_wrong_shape_refused() {
        // Extractable JSON that is not a command array still fails parsing.
        assert!(parse_commands("{\"not\": \"a batch\"}").is_none());
    }
}

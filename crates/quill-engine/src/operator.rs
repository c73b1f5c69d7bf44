//! The human seam: free-text answers and yes/no confirmations.
//!
//! The interpreter never reads stdin itself; it goes through an [`Operator`]
//! so interactive runs, non-interactive runs, and tests differ only in which
//! implementation is plugged in.

use std::collections::VecDeque;
use std::io::Write;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::EngineError;

/// Synchronous human interaction, suspended at the engine's I/O boundary.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Ask a free-text question and wait for the answer.
    async fn ask(&self, prompt: &str) -> Result<String, EngineError>;

    /// Ask a yes/no question and wait for the decision.
    async fn confirm(&self, question: &str) -> Result<bool, EngineError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Stdio implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Operator reading from stdin, for interactive CLI runs.
pub struct StdioOperator;

impl StdioOperator {
    fn read_line(prompt: String, marker: &'static str) -> Result<String, EngineError> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{prompt}").map_err(|e| EngineError::Operator(e.to_string()))?;
        write!(stdout, "{marker} ").map_err(|e| EngineError::Operator(e.to_string()))?;
        stdout
            .flush()
            .map_err(|e| EngineError::Operator(e.to_string()))?;

        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| EngineError::Operator(e.to_string()))?;
        if read == 0 {
            return Err(EngineError::Operator("stdin closed".into()));
        }
        Ok(line.trim().to_owned())
    }
}

#[async_trait]
impl Operator for StdioOperator {
    async fn ask(&self, prompt: &str) -> Result<String, EngineError> {
        let prompt = prompt.to_owned();
        tokio::task::spawn_blocking(move || Self::read_line(prompt, ">"))
            .await
            .map_err(|e| EngineError::Operator(format!("input task failed: {e}")))?
    }

    async fn confirm(&self, question: &str) -> Result<bool, EngineError> {
        let question = question.to_owned();
        let answer = tokio::task::spawn_blocking(move || Self::read_line(question, "[y/N]"))
            .await
            .map_err(|e| EngineError::Operator(format!("input task failed: {e}")))??;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Operator replaying scripted answers, for tests and non-interactive runs.
///
/// Free-text answers come from a queue and run out loudly (an error, not an
/// empty string). Confirmations come from a queue too, falling back to
/// `default_confirm` when the queue is empty.
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<String>>,
    confirmations: Mutex<VecDeque<bool>>,
    default_confirm: bool,
    questions: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    /// Create with the given confirmation fallback.
    #[must_use]
    pub fn new(default_confirm: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            confirmations: Mutex::new(VecDeque::new()),
            default_confirm,
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Builder: queue a free-text answer.
    #[must_use]
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        self.answers.lock().push_back(answer.into());
        self
    }

    /// Builder: queue one confirmation decision.
    #[must_use]
    pub fn with_confirmation(self, decision: bool) -> Self {
        self.confirmations.lock().push_back(decision);
        self
    }

    /// Every question asked so far (both kinds, in order).
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn ask(&self, prompt: &str) -> Result<String, EngineError> {
        self.questions.lock().push(prompt.to_owned());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| EngineError::Operator("script ran out of answers".into()))
    }

    async fn confirm(&self, question: &str) -> Result<bool, EngineError> {
        self.questions.lock().push(question.to_owned());
        Ok(self
            .confirmations
            .lock()
            .pop_front()
            .unwrap_or(self.default_confirm))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_answers_in_order() {
        let operator = ScriptedOperator::new(true)
            .with_answer("first")
            .with_answer("second");
        assert_eq!(operator.ask("q1").await.unwrap(), "first");
        assert_eq!(operator.ask("q2").await.unwrap(), "second");
        assert_eq!(operator.questions(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn scripted_runs_out_loudly() {
        let operator = ScriptedOperator::new(true);
        assert!(matches!(
            operator.ask("q").await,
            Err(EngineError::Operator(_))
        ));
    }

    #[tokio::test]
    async fn confirmations_fall_back_to_default() {
        let operator = ScriptedOperator::new(false).with_confirmation(true);
        assert!(operator.confirm("run?").await.unwrap());
        assert!(!operator.confirm("run again?").await.unwrap());
    }
}

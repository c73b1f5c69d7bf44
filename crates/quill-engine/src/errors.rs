//! Engine error types.

use thiserror::Error;

/// Failure inside the command interpreter.
///
/// Most variants are contained to the failing command: the batch logs them
/// and continues. [`EngineError::Operator`] aborts the run, since without a
/// human seam no confirmation or answer can ever arrive.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No valid command JSON was produced, even after reformat recovery.
    #[error("no valid command JSON after recovery")]
    Extraction,
    /// The completion gateway failed.
    #[error(transparent)]
    Gateway(#[from] quill_llm::GatewayError),
    /// A file-system operation failed.
    #[error("engine i/o: {0}")]
    Io(#[from] std::io::Error),
    /// Serializing a batch digest failed.
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The context cache could not be read or written.
    #[error(transparent)]
    Index(#[from] quill_index::IndexError),
    /// The human seam is broken (stdin closed, script exhausted).
    #[error("operator: {0}")]
    Operator(String),
    /// A shell task could not be joined.
    #[error("shell: {0}")]
    Shell(String),
}

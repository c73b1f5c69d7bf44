//! Index error types.

use thiserror::Error;

/// Failure while enumerating files or maintaining the context cache.
#[derive(Debug, Error)]
pub enum IndexError {
    /// File-system failure.
    #[error("index i/o: {0}")]
    Io(#[from] std::io::Error),
    /// Cache file is not valid JSON.
    #[error("context cache parse: {0}")]
    Json(#[from] serde_json::Error),
    /// An ignore or target pattern did not compile.
    #[error("pattern: {0}")]
    Pattern(#[from] globset::Error),
    /// Directory traversal failed.
    #[error("walk: {0}")]
    Walk(#[from] walkdir::Error),
    /// A description call to the model failed.
    #[error(transparent)]
    Gateway(#[from] quill_llm::GatewayError),
}

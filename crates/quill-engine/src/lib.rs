//! # quill-engine
//!
//! The agentic command-execution engine: a recursive interpreter that takes
//! a command batch emitted by the model, executes it against the file system
//! or shell, feeds the outcome back into a growing conversation, and repeats
//! until the model signals termination.
//!
//! - [`interpreter::Interpreter`] — dispatch, recursion, confirmation,
//!   termination propagation
//! - [`window::ContextWindow`] — lossy compaction of the oldest conversation
//!   slice when both size thresholds are exceeded
//! - [`operator::Operator`] — the human seam (free-text answers, yes/no
//!   confirmations)
//! - [`shell::ShellRunner`] — shell execution with a captured completion
//!   handle

pub mod errors;
pub mod interpreter;
pub mod operator;
pub mod paths;
mod prompts;
mod proposal;
pub mod shell;
pub mod window;

pub use errors::EngineError;
pub use interpreter::{Flow, Interpreter, InterpreterConfig};
pub use operator::{Operator, ScriptedOperator, StdioOperator};
pub use shell::{ShellOptions, ShellOutput, ShellRunner, ShellTask, TokioShellRunner};
pub use window::{ContextWindow, WindowConfig};

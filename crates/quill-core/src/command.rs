//! The command union the model emits and the interpreter executes.
//!
//! A batch is a JSON array of command objects, no envelope. Each object is
//! discriminated by `type` and then `action`. The union is closed: parsing
//! rejects unknown tags, and dispatch matches exhaustively, so there is no
//! runtime "unknown action" path.

use serde::{Deserialize, Serialize};

/// Flow-control actions that touch no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaAction {
    /// Stop execution, propagating through every enclosing batch.
    Terminate,
    /// Ask the model what to do after the current batch.
    Next,
}

/// Single-path file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Generate a new file from the command prompt.
    Create,
    /// Load a file's content into the conversation.
    Read,
    /// Regenerate an existing file from the command prompt.
    Update,
    /// Remove a file from disk and from the context cache.
    Delete,
    /// List a directory (non-recursive) into the conversation.
    ReadDir,
}

/// The single info action: elicit a human answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoAction {
    /// Ask the operator a free-text question before proceeding.
    #[serde(rename = "need-info")]
    NeedInfo,
}

/// The single split action: decompose a task into a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitAction {
    /// The task is too coarse to execute directly.
    #[serde(rename = "split_into_small_tasks")]
    SplitIntoSmallTasks,
}

/// The single shell action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BashAction {
    /// Run a literal shell command.
    #[serde(rename = "execute")]
    Execute,
}

/// One command in a batch.
///
/// `filePath` is camel-cased on the wire because the model is instructed with
/// that spelling; every command touches at most one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Interpreter flow control.
    #[serde(rename = "meta-command")]
    Meta {
        /// `terminate` or `next`.
        action: MetaAction,
    },
    /// A file operation on exactly one path.
    #[serde(rename = "file-command")]
    File {
        /// Which file operation.
        action: FileAction,
        /// The target path, resolved under the session base directory.
        #[serde(rename = "filePath")]
        file_path: String,
        /// Sub-generation instruction; required for create/update.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    /// Elicit a human answer.
    #[serde(rename = "info-command")]
    Info {
        /// Always `need-info`.
        action: InfoAction,
        /// The question for the operator.
        prompt: String,
    },
    /// Decompose a coarse task into a new command batch.
    #[serde(rename = "split-command")]
    Split {
        /// Always `split_into_small_tasks`.
        action: SplitAction,
        /// The path the coarse task concerns.
        #[serde(rename = "filePath")]
        file_path: String,
        /// The coarse task description.
        prompt: String,
    },
    /// A literal shell invocation.
    #[serde(rename = "bash-command")]
    Bash {
        /// Always `execute`.
        action: BashAction,
        /// The shell command line.
        command: String,
    },
}

impl Command {
    /// Shorthand for the `terminate` meta-command.
    #[must_use]
    pub fn terminate() -> Self {
        Command::Meta {
            action: MetaAction::Terminate,
        }
    }

    /// Shorthand for a `need-info` command.
    pub fn need_info(prompt: impl Into<String>) -> Self {
        Command::Info {
            action: InfoAction::NeedInfo,
            prompt: prompt.into(),
        }
    }
}

/// The machine-readable payload of a create/update sub-generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    /// The exact file content to write, no fences, no prose.
    pub code: String,
    /// One-line description of what was generated.
    pub description: String,
}

/// Parse a command batch from a JSON array string.
pub fn parse_batch(json: &str) -> Result<Vec<Command>, serde_json::Error> {
    serde_json::from_str(json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_file_create() {
        let batch = parse_batch(
            r#"[{"type":"file-command","action":"create","filePath":"a.txt","prompt":"hello"}]"#,
        )
        .unwrap();
        assert_matches!(
            &batch[0],
            Command::File { action: FileAction::Create, file_path, prompt: Some(p) }
                if file_path == "a.txt" && p == "hello"
        );
    }

    #[test]
    fn parse_file_read_without_prompt() {
        let batch =
            parse_batch(r#"[{"type":"file-command","action":"read","filePath":"src/x.rs"}]"#)
                .unwrap();
        assert_matches!(
            &batch[0],
            Command::File { action: FileAction::Read, prompt: None, .. }
        );
    }

    #[test]
    fn parse_read_dir() {
        let batch =
            parse_batch(r#"[{"type":"file-command","action":"read_dir","filePath":"src"}]"#)
                .unwrap();
        assert_matches!(&batch[0], Command::File { action: FileAction::ReadDir, .. });
    }

    #[test]
    fn parse_meta_terminate_and_next() {
        let batch = parse_batch(
            r#"[{"type":"meta-command","action":"terminate"},{"type":"meta-command","action":"next"}]"#,
        )
        .unwrap();
        assert_eq!(batch[0], Command::terminate());
        assert_matches!(batch[1], Command::Meta { action: MetaAction::Next });
    }

    #[test]
    fn parse_need_info() {
        let batch = parse_batch(
            r#"[{"type":"info-command","action":"need-info","prompt":"which db?"}]"#,
        )
        .unwrap();
        assert_matches!(&batch[0], Command::Info { prompt, .. } if prompt == "which db?");
    }

    #[test]
    fn parse_split() {
        let batch = parse_batch(
            r#"[{"type":"split-command","action":"split_into_small_tasks","filePath":"src/big.rs","prompt":"refactor"}]"#,
        )
        .unwrap();
        assert_matches!(
            &batch[0],
            Command::Split { file_path, .. } if file_path == "src/big.rs"
        );
    }

    #[test]
    fn parse_bash_execute() {
        let batch =
            parse_batch(r#"[{"type":"bash-command","action":"execute","command":"ls -la"}]"#)
                .unwrap();
        assert_matches!(&batch[0], Command::Bash { command, .. } if command == "ls -la");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = parse_batch(r#"[{"type":"paint-command","action":"draw"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result = parse_batch(r#"[{"type":"file-command","action":"chmod","filePath":"x"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_array_is_a_valid_batch() {
        assert!(parse_batch("[]").unwrap().is_empty());
    }

    #[test]
    fn batch_round_trips() {
        let batch = vec![
            Command::File {
                action: FileAction::Update,
                file_path: "b.rs".into(),
                prompt: Some("add docs".into()),
            },
            Command::terminate(),
        ];
        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(parse_batch(&json).unwrap(), batch);
    }

    #[test]
    fn serialized_file_command_uses_camel_case_path() {
        let cmd = Command::File {
            action: FileAction::Delete,
            file_path: "old.txt".into(),
            prompt: None,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"filePath\":\"old.txt\""));
        assert!(json.contains("\"action\":\"delete\""));
        assert!(!json.contains("prompt"));
    }

    #[test]
    fn code_response_round_trips() {
        let payload: CodeResponse =
            serde_json::from_str(r#"{"code":"fn main() {}","description":"entry point"}"#).unwrap();
        assert_eq!(payload.code, "fn main() {}");
        assert_eq!(payload.description, "entry point");
    }
}

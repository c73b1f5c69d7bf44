//! Fixed instructions the engine sends alongside conversation state.

/// Directive fixing the model's reply language.
pub(crate) fn language_directive(language: &str) -> String {
    format!(
        "Always answer in {language}. Code, identifiers, and file contents stay in the \
         project's programming language."
    )
}

/// Instruction describing the command-batch JSON the model must emit.
pub(crate) const COMMAND_SCHEMA: &str = r#"Reply with a JSON array of commands and nothing else. Each command is an object with a "type" and an "action":
- {"type": "file-command", "action": "create" | "update", "filePath": "...", "prompt": "instruction for the model that will produce the file content"}
- {"type": "file-command", "action": "read" | "delete" | "read_dir", "filePath": "..."}
- {"type": "info-command", "action": "need-info", "prompt": "question for the human"}
- {"type": "split-command", "action": "split_into_small_tasks", "filePath": "...", "prompt": "task that is too coarse"}
- {"type": "bash-command", "action": "execute", "command": "shell command line"}
- {"type": "meta-command", "action": "next"} to continue after these commands, or {"type": "meta-command", "action": "terminate"} to stop.
Each command works with exactly one file. The model executing a create/update prompt knows everything you know, but read a file first if its exact content matters."#;

/// Instruction for a create/update sub-generation.
pub(crate) fn code_response_instruction(file_path: &str) -> String {
    format!(
        "We are generating project files from the user's instructions. Take the existing \
         files into account. You are working on the file {file_path}. Reply with a JSON \
         object {{\"code\": \"...\", \"description\": \"...\"}} and no prose: `code` is the \
         exact content to write into the file (no markdown, no fences, no extra symbols), \
         `description` is one line about what was generated."
    )
}

/// Seed for a `split_into_small_tasks` recursion.
pub(crate) const SPLIT_SEED: &str =
    "Break this task into concrete file-operation commands.";

/// Seed for a `next` recursion.
pub(crate) const NEXT_SEED: &str =
    "All commands are done. What should we do next?";

/// The reformat-recovery instruction. Content must not change, only shape.
pub(crate) const REFORMAT: &str = "I could not parse that as JSON. Reformat your previous \
answer into strict JSON with no markdown and no other markup, changing nothing else. \
Remember it must be an array of commands; if there is no JSON to recover, answer with [{}].";

/// Request to summarize a removed conversation slice.
pub(crate) fn summary_request(slice_json: &str) -> String {
    format!(
        "Here is the oldest part of a conversation. Give a concise chronological summary \
         of what these messages say.\n{slice_json}"
    )
}

/// The synthetic message that replaces a summarized slice.
pub(crate) fn summary_note(summary: &str) -> String {
    format!("Earlier conversation, compressed into this summary:\n{summary}")
}

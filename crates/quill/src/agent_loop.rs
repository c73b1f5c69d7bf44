//! The interactive agent session.
//!
//! Refresh the project context once, then keep seeding the interpreter with
//! a `need-info` "What should we work on?" command until a `terminate`
//! unwinds out of the conversation.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use quill_core::command::Command;
use quill_core::messages::ConversationLog;
use quill_engine::{Flow, Interpreter, InterpreterConfig, StdioOperator, TokioShellRunner};
use quill_index::{ContextRefresher, ContextStore, IgnoreSet, walker};
use quill_llm::CompletionGateway;
use quill_settings::Settings;

/// The question that opens every iteration of the session.
const OPENING_PROMPT: &str = "What should we work on?";

/// Run the interactive session until the model terminates it.
pub async fn run(
    gateway: Arc<CompletionGateway>,
    settings: &Settings,
    root: &Path,
) -> anyhow::Result<()> {
    // Bring the per-file context cache up to date before the first exchange.
    let ignores = IgnoreSet::from_gitignore(root)?.build()?;
    let files = walker::project_files(root, &ignores)?;
    let refresher = ContextRefresher::new(
        Arc::clone(&gateway),
        ContextStore::new(root),
        root,
        settings.concurrency.describe,
    );
    let report = refresher.refresh(&files).await?;
    info!(
        described = report.described.len(),
        removed = report.removed.len(),
        unchanged = report.unchanged,
        "project context ready"
    );

    let config = InterpreterConfig::from_settings(settings, root.to_path_buf());
    let interpreter = Interpreter::new(
        gateway,
        Arc::new(StdioOperator),
        Arc::new(TokioShellRunner),
        config,
    );

    let mut log = ConversationLog::new();
    loop {
        let flow = interpreter
            .run(vec![Command::need_info(OPENING_PROMPT)], &mut log)
            .await?;
        if flow == Flow::Terminated {
            info!("session terminated");
            return Ok(());
        }
    }
}

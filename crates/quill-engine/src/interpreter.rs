//! The recursive command interpreter.
//!
//! Executes one batch strictly in order. Commands that spawn a new batch
//! (`need-info`, `split_into_small_tasks`, `next`) propose it through the
//! gateway, gate it behind operator confirmation, digest it into the parent
//! log, and recurse on a child log seeded from the triggering exchange. A
//! `terminate` anywhere propagates up through every recursion level at once.
//!
//! Failures are contained per command: a failed command is logged and the
//! batch continues with the next one. Only a broken operator seam aborts the
//! run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use quill_core::command::{Command, CodeResponse, FileAction, InfoAction, MetaAction};
use quill_core::extract::extract_json;
use quill_core::messages::{ChatMessage, ConversationLog};
use quill_core::retry::retry;
use quill_core::text::excerpt;
use quill_index::{ContextRefresher, ContextStore};
use quill_llm::{CompletionGateway, CompletionOptions, ResponseFormat};
use quill_settings::{ConfirmationPolicy, Settings};

use crate::errors::EngineError;
use crate::operator::Operator;
use crate::paths::resolve_path;
use crate::prompts;
use crate::shell::{ShellOptions, ShellRunner, ShellTask, spawn_shell};
use crate::window::{ContextWindow, WindowConfig};

/// How many bytes of shell output go into a log note.
const SHELL_NOTE_BUDGET: usize = 2_000;

/// Interpreter control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep executing the enclosing batch.
    Continue,
    /// A `terminate` was reached; stop every enclosing batch.
    Terminated,
}

/// Interpreter configuration, session-fixed.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Base directory command paths resolve under.
    pub base_dir: PathBuf,
    /// Natural language for model replies.
    pub reply_language: String,
    /// Minimum delay before each model call.
    pub throttle: Duration,
    /// Attempts per retryable unit (call plus extraction).
    pub retry_attempts: u32,
    /// Whether proposed batches need operator confirmation.
    pub confirmation: ConfirmationPolicy,
    /// Await shell commands inline instead of draining at batch end.
    pub await_shell: bool,
    /// Timeout for one shell command.
    pub shell_timeout_ms: u64,
    /// Compaction thresholds.
    pub window: WindowConfig,
}

impl InterpreterConfig {
    /// Defaults rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            reply_language: "English".into(),
            throttle: Duration::from_millis(400),
            retry_attempts: quill_core::retry::DEFAULT_ATTEMPTS,
            confirmation: ConfirmationPolicy::AlwaysAsk,
            await_shell: true,
            shell_timeout_ms: 120_000,
            window: WindowConfig::default(),
        }
    }

    /// Build from settings, rooted at `base_dir`.
    #[must_use]
    pub fn from_settings(settings: &Settings, base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            reply_language: settings.reply_language.clone(),
            throttle: Duration::from_millis(settings.engine.throttle_ms),
            retry_attempts: settings.retry.attempts,
            confirmation: settings.engine.confirmation,
            await_shell: settings.engine.await_shell,
            shell_timeout_ms: settings.engine.shell_timeout_ms,
            window: WindowConfig::from(&settings.window),
        }
    }
}

/// The command interpreter.
pub struct Interpreter {
    gateway: Arc<CompletionGateway>,
    operator: Arc<dyn Operator>,
    shell: Arc<dyn ShellRunner>,
    store: ContextStore,
    refresher: ContextRefresher,
    window: ContextWindow,
    config: InterpreterConfig,
    pending_shell: Mutex<Vec<ShellTask>>,
    cancellation: CancellationToken,
}

impl Interpreter {
    /// Create an interpreter.
    #[must_use]
    pub fn new(
        gateway: Arc<CompletionGateway>,
        operator: Arc<dyn Operator>,
        shell: Arc<dyn ShellRunner>,
        config: InterpreterConfig,
    ) -> Self {
        let store = ContextStore::new(&config.base_dir);
        let refresher = ContextRefresher::new(
            Arc::clone(&gateway),
            store.clone(),
            config.base_dir.clone(),
            1,
        );
        let window = ContextWindow::new(config.window.clone());
        Self {
            gateway,
            operator,
            shell,
            store,
            refresher,
            window,
            config,
            pending_shell: Mutex::new(Vec::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Token for cancelling in-flight shell commands.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Execute a batch against `log`, then drain any outstanding shell tasks.
    #[instrument(skip_all, fields(batch_len = batch.len()))]
    pub async fn run(
        &self,
        batch: Vec<Command>,
        log: &mut ConversationLog,
    ) -> Result<Flow, EngineError> {
        let flow = self.execute_batch(batch, log).await?;
        self.drain_shell_tasks(log).await;
        Ok(flow)
    }

    /// Execute one batch strictly in order.
    ///
    /// Boxed because recursion through `need-info`/`split`/`next` re-enters
    /// this function with a child log.
    pub(crate) fn execute_batch<'a>(
        &'a self,
        batch: Vec<Command>,
        log: &'a mut ConversationLog,
    ) -> BoxFuture<'a, Result<Flow, EngineError>> {
        Box::pin(async move {
            for command in batch {
                // Evaluated once per command iteration, never mid-command.
                let _ = self.window.maybe_compact(&self.gateway, log).await;

                let label = command_label(&command);
                match self.dispatch(command, log).await {
                    Ok(Flow::Terminated) => {
                        debug!("terminate reached, unwinding");
                        return Ok(Flow::Terminated);
                    }
                    Ok(Flow::Continue) => {}
                    Err(e @ EngineError::Operator(_)) => return Err(e),
                    Err(error) => {
                        warn!(%error, command = label, "command failed, continuing with next");
                    }
                }
            }
            Ok(Flow::Continue)
        })
    }

    async fn dispatch(
        &self,
        command: Command,
        log: &mut ConversationLog,
    ) -> Result<Flow, EngineError> {
        match command {
            Command::Meta {
                action: MetaAction::Terminate,
            } => Ok(Flow::Terminated),
            Command::Meta {
                action: MetaAction::Next,
            } => {
                self.continue_with(vec![ChatMessage::system(prompts::NEXT_SEED)], log)
                    .await
            }
            Command::Info {
                action: InfoAction::NeedInfo,
                prompt,
            } => {
                let answer = self.operator.ask(&prompt).await?;
                self.continue_with(
                    vec![ChatMessage::assistant(prompt), ChatMessage::user(answer)],
                    log,
                )
                .await
            }
            Command::Split { prompt, .. } => {
                self.continue_with(
                    vec![
                        ChatMessage::system(prompts::SPLIT_SEED),
                        ChatMessage::user(prompt),
                    ],
                    log,
                )
                .await
            }
            Command::File {
                action,
                file_path,
                prompt,
            } => {
                self.file_command(action, file_path, prompt, log).await?;
                Ok(Flow::Continue)
            }
            Command::Bash { command, .. } => self.bash_command(command, log).await,
        }
    }

    /// Shared shape of `need-info`, `split_into_small_tasks`, and `next`:
    /// append the exchange, propose a new batch, confirm it, digest it into
    /// the parent log, then recurse on a child log seeded from the exchange.
    async fn continue_with(
        &self,
        exchange: Vec<ChatMessage>,
        log: &mut ConversationLog,
    ) -> Result<Flow, EngineError> {
        log.extend(exchange.iter().cloned());

        // Re-evaluate compaction before any batch-proposing model call.
        let _ = self.window.maybe_compact(&self.gateway, log).await;

        let proposed = match self.propose_batch(log).await {
            Ok(batch) => batch,
            Err(EngineError::Extraction) => {
                // Fatal to this recursion level only: empty result upward.
                warn!("proposed batch unusable after recovery, aborting this branch");
                log.push(ChatMessage::system(
                    "The proposed command batch could not be parsed; nothing was executed.",
                ));
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(e),
        };

        let approved = self.confirm_batch(proposed).await?;
        log.push(ChatMessage::assistant(serde_json::to_string(&approved)?));

        let mut child = ConversationLog::seeded(exchange);
        self.execute_batch(approved, &mut child).await
    }

    /// Gate a proposed batch behind the confirmation policy. Declining
    /// yields an empty batch, not an error.
    async fn confirm_batch(&self, proposed: Vec<Command>) -> Result<Vec<Command>, EngineError> {
        if proposed.is_empty() {
            return Ok(proposed);
        }
        match self.config.confirmation {
            ConfirmationPolicy::AutoApprove => Ok(proposed),
            ConfirmationPolicy::AlwaysAsk => {
                let rendered = serde_json::to_string_pretty(&proposed)?;
                let question = format!("Execute this command batch?\n{rendered}");
                if self.operator.confirm(&question).await? {
                    Ok(proposed)
                } else {
                    info!("operator declined the proposed batch");
                    Ok(Vec::new())
                }
            }
        }
    }

    // ── file commands ───────────────────────────────────────────────────

    async fn file_command(
        &self,
        action: FileAction,
        file_path: String,
        prompt: Option<String>,
        log: &mut ConversationLog,
    ) -> Result<(), EngineError> {
        let resolved = resolve_path(&file_path, &self.config.base_dir);
        match action {
            FileAction::Create | FileAction::Update => {
                let Some(prompt) = prompt else {
                    // Missing prompt makes the command a silent no-op.
                    debug!(file_path, "create/update without prompt, skipping");
                    return Ok(());
                };

                if let Some(parent) = resolved.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let mut messages = Vec::with_capacity(log.len() + 4);
                messages.push(ChatMessage::system(prompts::language_directive(
                    &self.config.reply_language,
                )));
                messages.extend(log.messages().iter().cloned());
                messages.push(ChatMessage::system(self.file_synopsis()));
                messages.push(ChatMessage::system(prompts::code_response_instruction(
                    &file_path,
                )));
                messages.push(ChatMessage::user(prompt.clone()));

                let options = CompletionOptions {
                    response_format: Some(ResponseFormat::JsonObject),
                    ..CompletionOptions::default()
                };
                let this = self;
                let request: &[ChatMessage] = &messages;
                let options_ref = &options;
                let completion = match retry(self.config.retry_attempts, move |_| async move {
                    this.throttle().await;
                    this.gateway.complete(request, options_ref).await
                })
                .await
                {
                    Ok(completion) => completion,
                    Err(e) => {
                        warn!(error = %e, file_path, "sub-generation failed, abandoning command");
                        return Ok(());
                    }
                };

                let Some(payload) = parse_code_response(&completion.text) else {
                    warn!(file_path, "sub-generation returned no usable payload, abandoning");
                    return Ok(());
                };

                // Write the code verbatim; no reformatting, no fence stripping
                // beyond what extraction already guarantees.
                tokio::fs::write(&resolved, payload.code.as_bytes()).await?;
                info!(file_path, description = %payload.description, "file written");

                match self.refresher.describe_one(&file_path).await {
                    Ok(Some(entry)) => self.store.upsert(&file_path, entry)?,
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, file_path, "cache refresh failed"),
                }

                let executed = Command::File {
                    action,
                    file_path,
                    prompt: Some(prompt),
                };
                log.push(ChatMessage::system(format!(
                    "Executed command {}",
                    serde_json::to_string(&executed)?
                )));
                Ok(())
            }
            FileAction::Read => {
                let content = tokio::fs::read_to_string(&resolved).await?;
                log.push(ChatMessage::system(format!(
                    "The file {file_path} was read with the read command; its content:\n{content}"
                )));
                Ok(())
            }
            FileAction::ReadDir => {
                let mut entries = tokio::fs::read_dir(&resolved).await?;
                let mut names = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                names.sort();
                log.push(ChatMessage::system(format!(
                    "The directory {file_path} contains: {}",
                    names.join(", ")
                )));
                Ok(())
            }
            FileAction::Delete => {
                // Deletion failures are reported (via batch containment),
                // never retried.
                tokio::fs::remove_file(&resolved).await?;
                if let Err(e) = self.store.remove(&file_path) {
                    warn!(error = %e, file_path, "could not drop cache entry");
                }
                info!(file_path, "file deleted");
                Ok(())
            }
        }
    }

    // ── shell commands ──────────────────────────────────────────────────

    async fn bash_command(
        &self,
        command: String,
        log: &mut ConversationLog,
    ) -> Result<Flow, EngineError> {
        let opts = ShellOptions {
            working_directory: self.config.base_dir.clone(),
            timeout_ms: self.config.shell_timeout_ms,
            cancellation: self.cancellation.child_token(),
        };
        let task = spawn_shell(Arc::clone(&self.shell), command.clone(), opts);

        if self.config.await_shell {
            let output = task.join().await?;
            log.push(ChatMessage::system(shell_note(&command, &output)));
        } else {
            log.push(ChatMessage::system(format!(
                "Dispatched shell command `{command}`; its outcome will be reported when the batch ends."
            )));
            self.pending_shell.lock().push(task);
        }
        Ok(Flow::Continue)
    }

    /// Join every outstanding fire-and-forget shell task and report it.
    async fn drain_shell_tasks(&self, log: &mut ConversationLog) {
        let tasks: Vec<ShellTask> = std::mem::take(&mut *self.pending_shell.lock());
        for task in tasks {
            let command = task.command.clone();
            match task.join().await {
                Ok(output) => log.push(ChatMessage::system(shell_note(&command, &output))),
                Err(e) => {
                    warn!(error = %e, command, "shell task lost");
                    log.push(ChatMessage::system(format!(
                        "Shell command `{command}` did not report an outcome: {e}"
                    )));
                }
            }
        }
    }

    // ── shared helpers ──────────────────────────────────────────────────

    pub(crate) async fn throttle(&self) {
        if !self.config.throttle.is_zero() {
            tokio::time::sleep(self.config.throttle).await;
        }
    }

    pub(crate) fn file_synopsis(&self) -> String {
        match self.store.load() {
            Ok(map) => quill_index::synopsis(&map),
            Err(e) => {
                warn!(error = %e, "could not load context cache, synopsis empty");
                String::new()
            }
        }
    }

    pub(crate) fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }

    pub(crate) fn retry_attempts(&self) -> u32 {
        self.config.retry_attempts
    }
}

/// Parse a `{code, description}` payload out of raw model text.
fn parse_code_response(text: &str) -> Option<CodeResponse> {
    let json = extract_json(text)?;
    serde_json::from_str(&json).ok()
}

/// Render one shell outcome for the conversation log.
fn shell_note(command: &str, output: &crate::shell::ShellOutput) -> String {
    let status = if output.timed_out {
        "timed out".to_owned()
    } else if output.interrupted {
        "was cancelled".to_owned()
    } else {
        format!("exited with code {}", output.exit_code)
    };
    format!(
        "Shell command `{command}` {status}.\nstdout:\n{}\nstderr:\n{}",
        excerpt(&output.stdout, SHELL_NOTE_BUDGET),
        excerpt(&output.stderr, SHELL_NOTE_BUDGET),
    )
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Meta {
            action: MetaAction::Terminate,
        } => "terminate",
        Command::Meta {
            action: MetaAction::Next,
        } => "next",
        Command::Info { .. } => "need-info",
        Command::Split { .. } => "split_into_small_tasks",
        Command::Bash { .. } => "execute",
        Command::File { action, .. } => match action {
            FileAction::Create => "create",
            FileAction::Read => "read",
            FileAction::Update => "update",
            FileAction::Delete => "delete",
            FileAction::ReadDir => "read_dir",
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

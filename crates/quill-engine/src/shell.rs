//! Shell execution with a captured completion handle.
//!
//! A `bash-command` runs as an explicit asynchronous task whose handle
//! carries exit code, stdout, and stderr. The interpreter either awaits the
//! handle inline or drains it at batch end — there is no detached,
//! unobserved side effect.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::EngineError;

/// Options for one shell invocation.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Working directory for the command.
    pub working_directory: PathBuf,
    /// Kill the command after this long.
    pub timeout_ms: u64,
    /// Cooperative cancellation.
    pub cancellation: tokio_util::sync::CancellationToken,
}

/// Captured outcome of one shell command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Exit code; `-1` when killed.
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// The command hit its timeout.
    pub timed_out: bool,
    /// The command was cancelled.
    pub interrupted: bool,
}

/// A shell transport.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Run `command` to completion, honoring timeout and cancellation.
    async fn run(&self, command: &str, opts: &ShellOptions) -> Result<ShellOutput, EngineError>;
}

/// Real subprocess execution backed by `tokio::process::Command`.
pub struct TokioShellRunner;

#[async_trait]
impl ShellRunner for TokioShellRunner {
    async fn run(&self, command: &str, opts: &ShellOptions) -> Result<ShellOutput, EngineError> {
        let start = Instant::now();

        let mut cmd = tokio::process::Command::new("bash");
        let _ = cmd
            .arg("-c")
            .arg(command)
            .current_dir(&opts.working_directory)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        debug!(command, working_dir = %opts.working_directory.display(), "spawning shell command");

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::Shell(format!("failed to spawn: {e}")))?;

        let timeout = std::time::Duration::from_millis(opts.timeout_ms);
        let cancel = opts.cancellation.clone();

        // Take ownership of the pipes before the select so the child can be
        // killed on timeout/cancel without losing captured output handles.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| EngineError::Shell(format!("wait failed: {e}")))?;
                let stdout_bytes = stdout_handle.await.unwrap_or_default();
                let stderr_bytes = stderr_handle.await.unwrap_or_default();

                let exit_code = status.code().unwrap_or(-1);
                debug!(command, exit_code, "shell command completed");

                Ok(ShellOutput {
                    stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                    exit_code,
                    duration_ms: elapsed_ms(start),
                    timed_out: false,
                    interrupted: false,
                })
            }
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                warn!(command, timeout_ms = opts.timeout_ms, "shell command timed out");
                Ok(ShellOutput {
                    stdout: String::new(),
                    stderr: "Process timed out".into(),
                    exit_code: -1,
                    duration_ms: elapsed_ms(start),
                    timed_out: true,
                    interrupted: false,
                })
            }
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                debug!(command, "shell command cancelled");
                Ok(ShellOutput {
                    stdout: String::new(),
                    stderr: "Process cancelled".into(),
                    exit_code: -1,
                    duration_ms: elapsed_ms(start),
                    timed_out: false,
                    interrupted: true,
                })
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Shell tasks
// ─────────────────────────────────────────────────────────────────────────────

/// A spawned shell command with its captured completion handle.
pub struct ShellTask {
    /// The command line, kept for log notes.
    pub command: String,
    handle: JoinHandle<Result<ShellOutput, EngineError>>,
}

impl ShellTask {
    /// Wait for the command and return its captured outcome.
    pub async fn join(self) -> Result<ShellOutput, EngineError> {
        self.handle
            .await
            .map_err(|e| EngineError::Shell(format!("task join failed: {e}")))?
    }
}

/// Spawn `command` as a task with a captured completion handle.
#[must_use]
pub fn spawn_shell(
    runner: std::sync::Arc<dyn ShellRunner>,
    command: String,
    opts: ShellOptions,
) -> ShellTask {
    let task_command = command.clone();
    let handle = tokio::spawn(async move { runner.run(&task_command, &opts).await });
    ShellTask { command, handle }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

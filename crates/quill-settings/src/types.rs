//! Settings schema with compiled defaults.
//!
//! Every struct carries `#[serde(default)]` so a partial user file deep-merges
//! cleanly over the defaults. Field names are camel-cased on disk.

use serde::{Deserialize, Serialize};

/// Whether proposed command batches require an explicit yes/no from the
/// operator before they run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// Ask before executing every proposed batch. Declining yields an empty
    /// batch, not an error.
    #[default]
    AlwaysAsk,
    /// Execute proposed batches without asking (`--yes`).
    AutoApprove,
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Default model identifier.
    pub model: String,
    /// Provider base URL override; `None` uses the provider default.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Natural language the model should reply in.
    pub reply_language: String,
    /// Retry behavior for model calls.
    pub retry: RetrySettings,
    /// Command interpreter behavior.
    pub engine: EngineSettings,
    /// Context-window compaction thresholds.
    pub window: WindowSettings,
    /// Concurrency limits for independent generation jobs.
    pub concurrency: ConcurrencySettings,
    /// Test-generation defaults.
    pub generation: GenerationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            reply_language: "English".into(),
            retry: RetrySettings::default(),
            engine: EngineSettings::default(),
            window: WindowSettings::default(),
            concurrency: ConcurrencySettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

/// Retry behavior for model calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrySettings {
    /// Attempts per retryable unit (one LLM call plus extraction).
    pub attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { attempts: 2 }
    }
}

/// Command interpreter behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Minimum delay before each model call, in milliseconds.
    pub throttle_ms: u64,
    /// Await shell commands inline instead of draining them at batch end.
    pub await_shell: bool,
    /// Timeout for a single shell command, in milliseconds.
    pub shell_timeout_ms: u64,
    /// Confirmation policy for proposed batches.
    pub confirmation: ConfirmationPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            throttle_ms: 400,
            await_shell: true,
            shell_timeout_ms: 120_000,
            confirmation: ConfirmationPolicy::AlwaysAsk,
        }
    }
}

/// Context-window compaction thresholds.
///
/// Compaction triggers only when both the message count and the token
/// estimate exceed their thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSettings {
    /// Message-count threshold.
    pub max_messages: usize,
    /// Token-estimate threshold.
    pub token_budget: u32,
    /// How many of the oldest messages one compaction removes.
    pub slice_size: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            max_messages: 40,
            token_budget: 45_000,
            slice_size: 10,
        }
    }
}

/// Concurrency limits for independent generation jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConcurrencySettings {
    /// Simultaneous file-description calls during index refresh.
    pub describe: usize,
    /// Simultaneous artifact-generation calls (tests, docs pages).
    pub generate: usize,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            describe: 10,
            generate: 5,
        }
    }
}

/// Test-generation defaults, overridable per `quill gen` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Programming language of the project under test.
    pub language: String,
    /// Test framework to target.
    pub framework: String,
    /// Output directory for generated test files.
    pub out_dir: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            language: "TypeScript".into(),
            framework: "jest".into(),
            out_dir: "tests".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.api_key_env, "OPENAI_API_KEY");
        assert_eq!(s.retry.attempts, 2);
        assert_eq!(s.engine.throttle_ms, 400);
        assert!(s.engine.await_shell);
        assert_eq!(s.engine.confirmation, ConfirmationPolicy::AlwaysAsk);
        assert_eq!(s.window.max_messages, 40);
        assert_eq!(s.window.token_budget, 45_000);
        assert_eq!(s.window.slice_size, 10);
        assert_eq!(s.concurrency.describe, 10);
        assert_eq!(s.concurrency.generate, 5);
        assert_eq!(s.generation.out_dir, "tests");
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let s: Settings = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert_eq!(s.model, "gpt-4o");
        assert_eq!(s.retry.attempts, 2);
    }

    #[test]
    fn partial_nested_json_fills_in_defaults() {
        let s: Settings = serde_json::from_str(r#"{"engine": {"throttleMs": 50}}"#).unwrap();
        assert_eq!(s.engine.throttle_ms, 50);
        assert!(s.engine.await_shell);
    }

    #[test]
    fn confirmation_policy_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConfirmationPolicy::AutoApprove).unwrap(),
            "\"auto_approve\""
        );
        let p: ConfirmationPolicy = serde_json::from_str("\"always_ask\"").unwrap();
        assert_eq!(p, ConfirmationPolicy::AlwaysAsk);
    }

    #[test]
    fn settings_round_trip() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}

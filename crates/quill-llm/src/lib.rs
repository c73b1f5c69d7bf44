//! # quill-llm
//!
//! The completion gateway: everything between the engine and a hosted LLM.
//!
//! - [`provider::Provider`] — the transport seam: send an ordered list of
//!   role-tagged messages, receive one completion with token usage
//! - [`openai::OpenAiProvider`] — OpenAI-compatible chat-completions HTTP
//!   implementation
//! - [`gateway::CompletionGateway`] — provider plus the usage ledger; records
//!   usage after every successful call
//! - [`tokens`] — request-independent token estimation (degrades to `0` for
//!   unknown models, never errors)
//! - [`usage::UsageLedger`] — per-model cumulative counters persisted as one
//!   JSON file
//! - [`testutil::ScriptedProvider`] — in-process fake for engine and gateway
//!   tests

pub mod gateway;
pub mod openai;
pub mod provider;
pub mod testutil;
pub mod tokens;
pub mod usage;

pub use gateway::CompletionGateway;
pub use provider::{Completion, CompletionOptions, GatewayError, Provider, ResponseFormat, TokenUsage};

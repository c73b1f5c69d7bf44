//! # quill-core
//!
//! Foundation types and utilities for the Quill agent.
//!
//! This crate provides the shared vocabulary the other Quill crates depend on:
//!
//! - **Messages**: [`messages::ChatMessage`] role-tagged messages and the
//!   [`messages::ConversationLog`] append-only log with its parent/child
//!   ownership model
//! - **Commands**: [`command::Command`] — the closed tagged union the model
//!   emits and the interpreter executes
//! - **Extraction**: [`extract::extract_json`] — locating a JSON payload
//!   inside free-form model output
//! - **Retry**: [`retry::retry`] — bounded-attempt recovery for transient
//!   failures
//! - **Text**: [`text::clip_utf8`] — UTF-8-safe clipping for log notes
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other quill crates.

#![deny(unsafe_code)]

pub mod command;
pub mod extract;
pub mod messages;
pub mod retry;
pub mod text;

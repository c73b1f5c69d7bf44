//! # quill-index
//!
//! The project file index: what files exist, which are ignored, and what the
//! model already knows about each one.
//!
//! - [`ignore::IgnoreSet`] — gitignore-style pattern matching
//! - [`walker`] — project enumeration honoring ignore rules
//! - [`store::ContextStore`] — the per-file optimized-context cache, a
//!   whole-file JSON map behind a narrow read/update/write interface
//! - [`refresher::ContextRefresher`] — mtime-driven cache refresh with
//!   bounded-concurrency description calls

pub mod errors;
pub mod ignore;
pub mod refresher;
pub mod store;
pub mod walker;

pub use errors::IndexError;
pub use ignore::IgnoreSet;
pub use refresher::{ContextRefresher, RefreshReport};
pub use store::{ContextEntry, ContextMap, ContextStore, synopsis};

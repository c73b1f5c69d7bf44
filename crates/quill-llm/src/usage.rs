//! Per-model cumulative usage counters, persisted as one JSON file.
//!
//! The ledger is process-scoped state with an explicit load/flush lifecycle,
//! injected into the gateway rather than reached as a global. The file is a
//! map `modelId -> {completion_tokens, prompt_tokens, total_tokens}` and is
//! rewritten in full on every flush. Counters only grow, except through
//! [`UsageLedger::reset`]. Concurrent processes racing on the file is an
//! accepted limitation; within a process the map is one critical section.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::provider::TokenUsage;

/// File-backed cumulative usage counters, keyed by model id.
pub struct UsageLedger {
    path: PathBuf,
    counters: Mutex<BTreeMap<String, TokenUsage>>,
}

impl UsageLedger {
    /// Load the ledger from `path`. A missing file starts an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let counters = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "no usage file, starting empty ledger");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            counters: Mutex::new(counters),
        })
    }

    /// Add one call's usage to `model`'s counters (in memory only).
    pub fn record(&self, model: &str, usage: TokenUsage) {
        let mut counters = self.counters.lock();
        counters.entry(model.to_owned()).or_default().add(usage);
    }

    /// Add one call's usage and rewrite the file, as one critical section.
    pub fn record_and_flush(&self, model: &str, usage: TokenUsage) -> io::Result<()> {
        let mut counters = self.counters.lock();
        counters.entry(model.to_owned()).or_default().add(usage);
        Self::write_file(&self.path, &counters)
    }

    /// Rewrite the file from the in-memory counters.
    pub fn flush(&self) -> io::Result<()> {
        let counters = self.counters.lock();
        Self::write_file(&self.path, &counters)
    }

    /// Cumulative usage for `model`, if any was recorded.
    #[must_use]
    pub fn totals(&self, model: &str) -> Option<TokenUsage> {
        self.counters.lock().get(model).copied()
    }

    /// Explicitly zero every counter (the only way counters decrease).
    pub fn reset(&self) -> io::Result<()> {
        let mut counters = self.counters.lock();
        counters.clear();
        Self::write_file(&self.path, &counters)
    }

    fn write_file(path: &Path, counters: &BTreeMap<String, TokenUsage>) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(counters)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, body)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(completion: u64, prompt: u64) -> TokenUsage {
        TokenUsage {
            completion_tokens: completion,
            prompt_tokens: prompt,
            total_tokens: completion + prompt,
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = UsageLedger::load(dir.path().join("usage.json")).unwrap();
        assert!(ledger.totals("gpt-4o-mini").is_none());
    }

    #[test]
    fn record_accumulates_per_model() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = UsageLedger::load(dir.path().join("usage.json")).unwrap();
        ledger.record("gpt-4o-mini", usage(5, 10));
        ledger.record("gpt-4o-mini", usage(1, 2));
        ledger.record("gpt-4o", usage(100, 200));

        let mini = ledger.totals("gpt-4o-mini").unwrap();
        assert_eq!(mini.completion_tokens, 6);
        assert_eq!(mini.prompt_tokens, 12);
        assert_eq!(mini.total_tokens, 18);
        assert_eq!(ledger.totals("gpt-4o").unwrap().total_tokens, 300);
    }

    #[test]
    fn flush_then_reload_preserves_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        {
            let ledger = UsageLedger::load(&path).unwrap();
            ledger.record_and_flush("gpt-4o-mini", usage(5, 10)).unwrap();
        }
        let reloaded = UsageLedger::load(&path).unwrap();
        assert_eq!(reloaded.totals("gpt-4o-mini").unwrap().total_tokens, 15);
    }

    #[test]
    fn record_and_flush_twice_sums_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let ledger = UsageLedger::load(&path).unwrap();
        ledger.record_and_flush("m", usage(1, 1)).unwrap();
        ledger.record_and_flush("m", usage(2, 2)).unwrap();

        let reloaded = UsageLedger::load(&path).unwrap();
        assert_eq!(reloaded.totals("m").unwrap().total_tokens, 6);
    }

    #[test]
    fn reset_zeroes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let ledger = UsageLedger::load(&path).unwrap();
        ledger.record_and_flush("m", usage(5, 5)).unwrap();
        ledger.reset().unwrap();
        assert!(ledger.totals("m").is_none());

        let reloaded = UsageLedger::load(&path).unwrap();
        assert!(reloaded.totals("m").is_none());
    }

    #[test]
    fn creates_parent_directories_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/usage.json");
        let ledger = UsageLedger::load(&path).unwrap();
        ledger.record_and_flush("m", usage(1, 0)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(UsageLedger::load(&path).is_err());
    }
}

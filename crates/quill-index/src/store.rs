//! The optimized-context cache: one compact model-generated description per
//! project file, used in place of full file content to control prompt size.
//!
//! The cache is a single JSON file (`.quill/optimized.json`) mapping
//! root-relative paths to [`ContextEntry`] records, rewritten in full on
//! every update. The store is single-writer by design; concurrent processes
//! racing on the file is an accepted limitation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::IndexError;

/// Cache file name under `.quill/`.
const CACHE_FILE: &str = "optimized.json";

/// One cached file description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    /// Source file creation time, Unix milliseconds.
    pub created_at: u64,
    /// Source file modification time at description, Unix milliseconds.
    /// The entry is stale once the file's mtime advances past this.
    pub updated_at: u64,
    /// The model-generated technical summary.
    pub result: String,
    /// Whether an artifact (e.g. a test file) was generated from this file.
    #[serde(default)]
    pub generated: bool,
    /// Path of the generated artifact, when `generated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_file: Option<String>,
}

/// The whole cache, keyed by root-relative source path.
pub type ContextMap = BTreeMap<String, ContextEntry>;

/// Narrow read/update/write interface over the cache file.
#[derive(Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    /// Store for the project rooted at `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(".quill").join(CACHE_FILE),
        }
    }

    /// Store at an explicit file path.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole map. A missing file is an empty map.
    pub fn load(&self) -> Result<ContextMap, IndexError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ContextMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite the whole map.
    pub fn save(&self, map: &ContextMap) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(map)?)?;
        Ok(())
    }

    /// Insert or replace one entry (read-modify-write).
    pub fn upsert(&self, file: &str, entry: ContextEntry) -> Result<(), IndexError> {
        let mut map = self.load()?;
        let _ = map.insert(file.to_owned(), entry);
        self.save(&map)
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&self, file: &str) -> Result<bool, IndexError> {
        let mut map = self.load()?;
        let existed = map.remove(file).is_some();
        if existed {
            self.save(&map)?;
        }
        Ok(existed)
    }

    /// Mark a file's artifact as generated. Returns whether the entry existed.
    pub fn mark_generated(&self, file: &str, generated_file: &str) -> Result<bool, IndexError> {
        let mut map = self.load()?;
        let Some(entry) = map.get_mut(file) else {
            return Ok(false);
        };
        entry.generated = true;
        entry.generated_file = Some(generated_file.to_owned());
        self.save(&map)?;
        Ok(true)
    }
}

/// Render the cache as a prompt-ready synopsis of all known project files.
#[must_use]
pub fn synopsis(map: &ContextMap) -> String {
    let mut out = String::new();
    for (file, entry) in map {
        out.push_str("file path: ");
        out.push_str(file);
        out.push_str("\nfile description: ");
        out.push_str(&entry.result);
        out.push('\n');
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Mtime-driven refresh of the optimized-context cache.
//!
//! A file is described when it has no cache entry or when its modification
//! time has advanced past the stored one; entries whose source file left the
//! project are dropped. Description calls run under a semaphore so at most
//! `limit` requests are in flight — the only true parallelism in the system,
//! there to respect provider rate limits.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::errors::IndexError;
use crate::store::{ContextEntry, ContextStore};
use quill_llm::{CompletionGateway, CompletionOptions};
use quill_core::messages::ChatMessage;

/// What one refresh did.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Files that were (re)described.
    pub described: Vec<String>,
    /// Cache entries dropped because their source file vanished.
    pub removed: Vec<String>,
    /// Files whose entries were still current.
    pub unchanged: usize,
}

/// Keeps the context cache in sync with the project tree.
pub struct ContextRefresher {
    gateway: Arc<CompletionGateway>,
    store: ContextStore,
    root: PathBuf,
    limit: usize,
}

impl ContextRefresher {
    /// Create a refresher for the project at `root`.
    pub fn new(
        gateway: Arc<CompletionGateway>,
        store: ContextStore,
        root: impl Into<PathBuf>,
        limit: usize,
    ) -> Self {
        Self {
            gateway,
            store,
            root: root.into(),
            limit: limit.max(1),
        }
    }

    /// Bring the cache up to date for the given project files.
    pub async fn refresh(&self, files: &[String]) -> Result<RefreshReport, IndexError> {
        let mut map = self.store.load()?;
        let current: BTreeSet<&str> = files.iter().map(String::as_str).collect();
        let mut report = RefreshReport::default();

        // Drop entries for files no longer in the project.
        let stale: Vec<String> = map
            .keys()
            .filter(|k| !current.contains(k.as_str()))
            .cloned()
            .collect();
        for key in stale {
            let _ = map.remove(&key);
            report.removed.push(key);
        }

        // Files with no entry, or whose mtime advanced past the stored one.
        let mut changed = Vec::new();
        for file in files {
            match (map.get(file), mtime_millis(&self.root.join(file))) {
                (Some(entry), Ok(mtime)) if mtime <= entry.updated_at => report.unchanged += 1,
                (_, Err(e)) => warn!(file, error = %e, "cannot stat file, skipping"),
                _ => changed.push(file.clone()),
            }
        }

        debug!(
            changed = changed.len(),
            removed = report.removed.len(),
            unchanged = report.unchanged,
            "context refresh plan"
        );

        // Describe changed files with bounded concurrency.
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let described = futures::future::join_all(changed.iter().map(|file| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (file.clone(), None);
                };
                match self.describe_one(file).await {
                    Ok(entry) => (file.clone(), entry),
                    Err(e) => {
                        warn!(file, error = %e, "description failed, keeping stale entry");
                        (file.clone(), None)
                    }
                }
            }
        }))
        .await;

        for (file, entry) in described {
            if let Some(entry) = entry {
                let _ = map.insert(file.clone(), entry);
                report.described.push(file);
            }
        }

        self.store.save(&map)?;
        info!(
            described = report.described.len(),
            removed = report.removed.len(),
            "context cache refreshed"
        );
        Ok(report)
    }

    /// Describe one file. `Ok(None)` when the file is empty (nothing to say).
    pub async fn describe_one(&self, file: &str) -> Result<Option<ContextEntry>, IndexError> {
        let path = self.root.join(file);
        let content = tokio::fs::read_to_string(&path).await?;
        if content.is_empty() {
            return Ok(None);
        }

        let metadata = std::fs::metadata(&path)?;
        let updated_at = system_time_millis(metadata.modified()?);
        let created_at = metadata
            .created()
            .map_or(updated_at, system_time_millis);

        let prompt = describe_prompt(file, &content);
        let completion = self
            .gateway
            .complete(&[ChatMessage::user(prompt)], &CompletionOptions::default())
            .await?;

        Ok(Some(ContextEntry {
            created_at,
            updated_at,
            result: completion.text,
            generated: false,
            generated_file: None,
        }))
    }
}

/// The description request for one file.
fn describe_prompt(file: &str, content: &str) -> String {
    let extension = Path::new(file)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "This is a source file with extension `{extension}`. Summarize the minimal \
         technical information about it: the functions and types it defines, their \
         signatures, and what they do. Answer in very short plain text, no prose \
         for humans, no markup.\n\nFile: {file}\n\n{content}"
    )
}

fn mtime_millis(path: &Path) -> std::io::Result<u64> {
    Ok(system_time_millis(std::fs::metadata(path)?.modified()?))
}

fn system_time_millis(time: std::time::SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use quill_llm::testutil::ScriptedProvider;
    use quill_llm::usage::UsageLedger;

    struct Fixture {
        dir: tempfile::TempDir,
        provider: Arc<ScriptedProvider>,
        gateway: Arc<CompletionGateway>,
    }

    fn fixture(responses: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = ScriptedProvider::new("gpt-4o-mini");
        for response in responses {
            provider = provider.with_text(*response);
        }
        let provider = Arc::new(provider);
        let ledger = UsageLedger::load(dir.path().join("usage.json")).unwrap();
        let gateway = Arc::new(CompletionGateway::new(
            Arc::clone(&provider) as Arc<dyn quill_llm::Provider>,
            Arc::new(ledger),
        ));
        Fixture {
            dir,
            provider,
            gateway,
        }
    }

    fn refresher_for(f: &Fixture, limit: usize) -> ContextRefresher {
        ContextRefresher::new(
            Arc::clone(&f.gateway),
            ContextStore::new(f.dir.path()),
            f.dir.path(),
            limit,
        )
    }

    fn touch(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn new_files_are_described() {
        let f = fixture(&["summary of a", "summary of b"]);
        touch(f.dir.path(), "a.ts", "export const a = 1");
        touch(f.dir.path(), "b.ts", "export const b = 2");

        let refresher = refresher_for(&f, 2);
        let report = refresher
            .refresh(&["a.ts".into(), "b.ts".into()])
            .await
            .unwrap();

        assert_eq!(report.described.len(), 2);
        assert_eq!(f.provider.call_count(), 2);

        let map = ContextStore::new(f.dir.path()).load().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["a.ts"].result.starts_with("summary of"));
    }

    #[tokio::test]
    async fn current_entries_are_not_redescribed() {
        let f = fixture(&["first description"]);
        touch(f.dir.path(), "a.ts", "export const a = 1");

        let refresher = refresher_for(&f, 1);
        let _ = refresher.refresh(&["a.ts".into()]).await.unwrap();
        assert_eq!(f.provider.call_count(), 1);

        // Second refresh: mtime unchanged, no further model call.
        let report = refresher.refresh(&["a.ts".into()]).await.unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(report.described.is_empty());
        assert_eq!(f.provider.call_count(), 1);
    }

    #[tokio::test]
    async fn advanced_mtime_triggers_redescription() {
        let f = fixture(&["stale", "fresh"]);
        touch(f.dir.path(), "a.ts", "v1");

        let refresher = refresher_for(&f, 1);
        let _ = refresher.refresh(&["a.ts".into()]).await.unwrap();

        // Simulate an edit by winding the stored mtime backwards.
        let store = ContextStore::new(f.dir.path());
        let mut map = store.load().unwrap();
        map.get_mut("a.ts").unwrap().updated_at -= 10;
        store.save(&map).unwrap();

        let report = refresher.refresh(&["a.ts".into()]).await.unwrap();
        assert_eq!(report.described, vec!["a.ts"]);
        assert_eq!(store.load().unwrap()["a.ts"].result, "fresh");
    }

    #[tokio::test]
    async fn vanished_files_are_dropped() {
        let f = fixture(&[]);
        let store = ContextStore::new(f.dir.path());
        store
            .upsert(
                "gone.ts",
                ContextEntry {
                    created_at: 1,
                    updated_at: 1,
                    result: "old".into(),
                    generated: false,
                    generated_file: None,
                },
            )
            .unwrap();

        let refresher = refresher_for(&f, 1);
        let report = refresher.refresh(&[]).await.unwrap();
        assert_eq!(report.removed, vec!["gone.ts"]);
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_files_are_skipped() {
        let f = fixture(&[]);
        touch(f.dir.path(), "empty.ts", "");

        let refresher = refresher_for(&f, 1);
        let report = refresher.refresh(&["empty.ts".into()]).await.unwrap();
        assert!(report.described.is_empty());
        assert_eq!(f.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn description_failure_keeps_going() {
        // Script: only one response; the second file's call comes up dry and
        // is skipped without failing the whole refresh.
        let f = fixture(&["only one"]);
        touch(f.dir.path(), "a.ts", "aaa");
        touch(f.dir.path(), "b.ts", "bbb");

        let refresher = refresher_for(&f, 1);
        let report = refresher
            .refresh(&["a.ts".into(), "b.ts".into()])
            .await
            .unwrap();
        assert_eq!(report.described.len(), 1);
    }

    #[tokio::test]
    async fn describe_one_reads_mtime() {
        let f = fixture(&["desc"]);
        touch(f.dir.path(), "a.ts", "content");

        let refresher = refresher_for(&f, 1);
        let entry = refresher.describe_one("a.ts").await.unwrap().unwrap();
        let expected = mtime_millis(&f.dir.path().join("a.ts")).unwrap();
        assert_eq!(entry.updated_at, expected);
        assert!(!entry.generated);
    }
}

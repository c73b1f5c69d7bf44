//! Test-file generation for a path pattern.
//!
//! Enumerate matching project files, refresh the context cache, and generate
//! one test file per source file that has no up-to-date generated artifact.
//! Generated files land under the output directory mirroring the source
//! tree, with `.test` inserted before the extension. Generation jobs are
//! independent, so they run under a bounded concurrency limit.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use quill_core::messages::ChatMessage;
use quill_index::{ContextRefresher, ContextStore, IgnoreSet, walker};
use quill_llm::{CompletionGateway, CompletionOptions};

/// One `quill gen` invocation.
pub struct GenOptions {
    /// Target path pattern, e.g. `src/**/*.ts`.
    pub pattern: String,
    /// Output directory for generated tests.
    pub out_dir: String,
    /// Programming language of the project under test.
    pub language: String,
    /// Test framework to target.
    pub framework: String,
    /// Simultaneous generation calls.
    pub concurrency: usize,
    /// Simultaneous description calls during the refresh.
    pub describe_concurrency: usize,
}

/// What one run produced.
#[derive(Debug, Default)]
pub struct GenReport {
    /// Source files a test was generated for.
    pub generated: Vec<String>,
    /// Source files whose generated test was already current.
    pub skipped: usize,
}

/// Generate tests for every matching file that needs one.
pub async fn run(
    gateway: Arc<CompletionGateway>,
    root: &Path,
    options: &GenOptions,
) -> anyhow::Result<GenReport> {
    let mut ignore_builder = IgnoreSet::from_gitignore(root)?;
    let _ = ignore_builder.add_dir(&options.out_dir)?;
    let ignores = ignore_builder.build()?;

    let files = walker::project_files(root, &ignores)?;
    let targets = walker::filter_by_pattern(&files, &options.pattern)?;

    let store = ContextStore::new(root);
    let refresher = ContextRefresher::new(
        Arc::clone(&gateway),
        store.clone(),
        root,
        options.describe_concurrency,
    );
    let _ = refresher.refresh(&files).await?;

    let map = store.load()?;
    let mut report = GenReport::default();

    // A file needs generation when its test file is missing or its cache
    // entry lost the `generated` flag (the file changed since).
    let to_generate: Vec<String> = targets
        .into_iter()
        .filter(|file| {
            let test_path = test_file_path(file, &options.out_dir);
            let current = root.join(&test_path).exists()
                && map.get(file).is_some_and(|entry| entry.generated);
            if current {
                report.skipped += 1;
            }
            !current
        })
        .collect();

    if to_generate.is_empty() {
        info!("no files changed, nothing to generate");
        return Ok(report);
    }
    info!(count = to_generate.len(), "generating test files");

    let synopsis = quill_index::synopsis(&map);
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let outcomes = futures::future::join_all(to_generate.iter().map(|file| {
        let semaphore = Arc::clone(&semaphore);
        let gateway = &gateway;
        let store = &store;
        let synopsis = synopsis.as_str();
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return None;
            };
            match generate_one(gateway, store, root, file, synopsis, options).await {
                Ok(()) => Some(file.clone()),
                Err(e) => {
                    warn!(file, error = %e, "test generation failed");
                    None
                }
            }
        }
    }))
    .await;

    report.generated = outcomes.into_iter().flatten().collect();
    Ok(report)
}

/// Generate and write one test file, then mark its cache entry.
async fn generate_one(
    gateway: &CompletionGateway,
    store: &ContextStore,
    root: &Path,
    file: &str,
    synopsis: &str,
    options: &GenOptions,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(root.join(file)).await?;
    if content.is_empty() {
        return Ok(());
    }
    let test_path = test_file_path(file, &options.out_dir);

    let messages = vec![
        ChatMessage::system(format!(
            "The project is written in {} and its tests use {}. Short descriptions of the \
             known project files:\n{synopsis}\nThe file under test:\npath: {file}\ncontent:\n{content}",
            options.language, options.framework,
        )),
        ChatMessage::user(format!(
            "Write the complete test file for {file}. It will live at {test_path}; use that \
             location to get the imports right. Cover the edge cases, with extra attention \
             on the main functionality. Reply with only the code to put into the file, \
             no markdown, no explanation."
        )),
    ];

    let completion = gateway
        .complete(&messages, &CompletionOptions::default())
        .await?;
    let code = strip_fences(gateway, completion.text).await?;

    let target = root.join(&test_path);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, code).await?;
    let _ = store.mark_generated(file, &test_path)?;
    info!(file, test_path, "test file written");
    Ok(())
}

/// One cleanup pass when the model wrapped its answer in fences anyway.
async fn strip_fences(gateway: &CompletionGateway, text: String) -> anyhow::Result<String> {
    if !text.contains("```") {
        return Ok(text);
    }
    let messages = vec![
        ChatMessage::assistant(text),
        ChatMessage::user(
            "Remove everything that is not code and reply with only the file content, \
             no fences, no explanation.",
        ),
    ];
    let completion = gateway
        .complete(&messages, &CompletionOptions::default())
        .await?;
    Ok(completion.text)
}

/// Map a source path to its generated-test path under `out_dir`.
///
/// `src/a.ts` with out dir `tests` becomes `tests/src/a.test.ts`.
pub fn test_file_path(file: &str, out_dir: &str) -> String {
    let mapped = match Path::new(file).extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let stem_len = file.len() - ext.len() - 1;
            format!("{}.test.{ext}", &file[..stem_len])
        }
        None => format!("{file}.test"),
    };
    format!("{}/{mapped}", out_dir.trim_end_matches('/'))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

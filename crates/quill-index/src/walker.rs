//! Project file enumeration.
//!
//! Walks the project tree, pruning ignored directories early, and returns
//! sorted root-relative paths. `.git` and `.quill` are always pruned.

use std::path::Path;

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::errors::IndexError;
use crate::ignore::IgnoreSet;

/// Directories that are never part of the project.
const ALWAYS_PRUNED: &[&str] = &[".git", ".quill"];

/// Enumerate project files under `root`, honoring `ignores`.
///
/// Returns root-relative paths, sorted.
pub fn project_files(root: &Path, ignores: &IgnoreSet) -> Result<Vec<String>, IndexError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let Some(rel) = relative(root, entry.path()) else {
                return true;
            };
            if rel.is_empty() {
                return true;
            }
            if ALWAYS_PRUNED.contains(&rel.as_str()) {
                return false;
            }
            // Prune ignored directories so their subtrees are never visited.
            !(entry.file_type().is_dir() && ignores.matches(&rel))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative(root, entry.path()) else {
            continue;
        };
        if ignores.matches(&rel) {
            continue;
        }
        files.push(rel);
    }

    files.sort();
    Ok(files)
}

/// Keep only the files matching a target glob pattern (e.g. `src/**/*.ts`).
pub fn filter_by_pattern(files: &[String], pattern: &str) -> Result<Vec<String>, IndexError> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher();
    Ok(files
        .iter()
        .filter(|f| matcher.is_match(Path::new(f.as_str())))
        .cloned()
        .collect())
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "content").unwrap();
    }

    fn no_ignores() -> IgnoreSet {
        IgnoreSet::builder().build().unwrap()
    }

    #[test]
    fn enumerates_sorted_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/b.rs");
        touch(dir.path(), "src/a.rs");
        touch(dir.path(), "README.md");

        let files = project_files(dir.path(), &no_ignores()).unwrap();
        assert_eq!(files, vec!["README.md", "src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn git_and_quill_always_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".git/HEAD");
        touch(dir.path(), ".quill/optimized.json");
        touch(dir.path(), "src/main.rs");

        let files = project_files(dir.path(), &no_ignores()).unwrap();
        assert_eq!(files, vec!["src/main.rs"]);
    }

    #[test]
    fn ignored_directory_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "node_modules/pkg/index.js");
        touch(dir.path(), "src/main.ts");

        let mut builder = IgnoreSet::builder();
        let _ = builder.add_line("node_modules").unwrap();
        let ignores = builder.build().unwrap();

        let files = project_files(dir.path(), &ignores).unwrap();
        assert_eq!(files, vec!["src/main.ts"]);
    }

    #[test]
    fn ignored_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "debug.log");
        touch(dir.path(), "src/main.ts");

        let mut builder = IgnoreSet::builder();
        let _ = builder.add_line("*.log").unwrap();
        let ignores = builder.build().unwrap();

        let files = project_files(dir.path(), &ignores).unwrap();
        assert_eq!(files, vec!["src/main.ts"]);
    }

    #[test]
    fn empty_project_yields_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = project_files(dir.path(), &no_ignores()).unwrap();
        assert!(files.is_empty());
    }

    // ── filter_by_pattern ────────────────────────────────────────────────

    #[test]
    fn pattern_filters_by_extension() {
        let files = vec![
            "src/a.ts".to_owned(),
            "src/sub/b.ts".to_owned(),
            "src/c.rs".to_owned(),
        ];
        let matched = filter_by_pattern(&files, "src/**/*.ts").unwrap();
        assert_eq!(matched, vec!["src/a.ts", "src/sub/b.ts"]);
    }

    #[test]
    fn pattern_star_stays_in_one_directory() {
        let files = vec!["src/a.ts".to_owned(), "src/sub/b.ts".to_owned()];
        let matched = filter_by_pattern(&files, "src/*.ts").unwrap();
        assert_eq!(matched, vec!["src/a.ts"]);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(filter_by_pattern(&[], "src/[").is_err());
    }
}

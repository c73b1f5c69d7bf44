//! Gitignore-style pattern matching compiled to a `GlobSet`.
//!
//! Supports the common subset: blank lines and `#` comments are skipped,
//! a leading `/` anchors to the project root, a trailing `/` marks a
//! directory, and unanchored patterns match at any depth. Negation (`!`)
//! lines are not supported and are skipped with a debug log.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::debug;

use crate::errors::IndexError;

/// A compiled set of ignore patterns.
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    /// Start building a set.
    #[must_use]
    pub fn builder() -> IgnoreSetBuilder {
        IgnoreSetBuilder {
            builder: GlobSetBuilder::new(),
        }
    }

    /// Build a set from the project's `.gitignore`, if present.
    pub fn from_gitignore(root: &Path) -> Result<IgnoreSetBuilder, IndexError> {
        let mut builder = Self::builder();
        match std::fs::read_to_string(root.join(".gitignore")) {
            Ok(content) => {
                let _ = builder.add_lines(&content)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no .gitignore, ignoring nothing");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(builder)
    }

    /// Whether `relative_path` is ignored.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        self.set.is_match(Path::new(relative_path))
    }
}

/// Builder for [`IgnoreSet`].
pub struct IgnoreSetBuilder {
    builder: GlobSetBuilder,
}

impl IgnoreSetBuilder {
    /// Add one gitignore-style line.
    pub fn add_line(&mut self, line: &str) -> Result<&mut Self, IndexError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(self);
        }
        if let Some(negated) = line.strip_prefix('!') {
            debug!(pattern = negated, "negated ignore patterns are not supported, skipping");
            return Ok(self);
        }

        let anchored = line.starts_with('/');
        let core = line.trim_start_matches('/').trim_end_matches('/');
        if core.is_empty() {
            return Ok(self);
        }

        if anchored {
            self.add_glob(core)?;
            self.add_glob(&format!("{core}/**"))?;
        } else {
            self.add_glob(core)?;
            self.add_glob(&format!("{core}/**"))?;
            self.add_glob(&format!("**/{core}"))?;
            self.add_glob(&format!("**/{core}/**"))?;
        }
        Ok(self)
    }

    /// Add every line of a gitignore-style file body.
    pub fn add_lines(&mut self, content: &str) -> Result<&mut Self, IndexError> {
        for line in content.lines() {
            let _ = self.add_line(line)?;
        }
        Ok(self)
    }

    /// Ignore a whole directory (used for the output directory).
    pub fn add_dir(&mut self, dir: &str) -> Result<&mut Self, IndexError> {
        self.add_line(&format!("{}/", dir.trim_end_matches('/')))
    }

    /// Compile the set.
    pub fn build(&self) -> Result<IgnoreSet, IndexError> {
        Ok(IgnoreSet {
            set: self.builder.build()?,
        })
    }

    fn add_glob(&mut self, pattern: &str) -> Result<(), IndexError> {
        // literal_separator keeps `*` from crossing directory boundaries,
        // matching gitignore semantics.
        let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
        let _ = self.builder.add(glob);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(lines: &[&str]) -> IgnoreSet {
        let mut builder = IgnoreSet::builder();
        for line in lines {
            let _ = builder.add_line(line).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn bare_name_matches_at_any_depth() {
        let set = set_of(&["node_modules"]);
        assert!(set.matches("node_modules"));
        assert!(set.matches("node_modules/lodash/index.js"));
        assert!(set.matches("packages/app/node_modules/x.js"));
        assert!(!set.matches("src/modules.rs"));
    }

    #[test]
    fn trailing_slash_marks_directory() {
        let set = set_of(&["dist/"]);
        assert!(set.matches("dist/bundle.js"));
        assert!(set.matches("dist"));
    }

    #[test]
    fn anchored_pattern_only_matches_root() {
        let set = set_of(&["/target"]);
        assert!(set.matches("target"));
        assert!(set.matches("target/debug/app"));
        assert!(!set.matches("crates/foo/target"));
    }

    #[test]
    fn extension_glob() {
        let set = set_of(&["*.log"]);
        assert!(set.matches("debug.log"));
        assert!(set.matches("logs/today.log"));
        assert!(!set.matches("src/log.rs"));
    }

    #[test]
    fn star_does_not_cross_separators() {
        let set = set_of(&["/src/*.tmp"]);
        assert!(set.matches("src/a.tmp"));
        assert!(!set.matches("src/nested/a.tmp"));
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let set = set_of(&["# a comment", "", "out"]);
        assert!(set.matches("out"));
        assert!(!set.matches("# a comment"));
    }

    #[test]
    fn negation_is_skipped() {
        let set = set_of(&["*.log", "!keep.log"]);
        // Unsupported: the negation line is dropped, so keep.log stays ignored.
        assert!(set.matches("keep.log"));
    }

    #[test]
    fn add_lines_handles_whole_file() {
        let mut builder = IgnoreSet::builder();
        let _ = builder.add_lines("node_modules\n# comment\ndist/\n").unwrap();
        let set = builder.build().unwrap();
        assert!(set.matches("node_modules/x"));
        assert!(set.matches("dist/y"));
    }

    #[test]
    fn add_dir_ignores_subtree() {
        let mut builder = IgnoreSet::builder();
        let _ = builder.add_dir("tests").unwrap();
        let set = builder.build().unwrap();
        assert!(set.matches("tests/src/a.test.ts"));
        assert!(set.matches("tests"));
    }

    #[test]
    fn from_gitignore_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "build\n*.bak\n").unwrap();
        let set = IgnoreSet::from_gitignore(dir.path()).unwrap().build().unwrap();
        assert!(set.matches("build/out.o"));
        assert!(set.matches("notes.bak"));
        assert!(!set.matches("src/main.rs"));
    }

    #[test]
    fn from_gitignore_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = IgnoreSet::from_gitignore(dir.path()).unwrap().build().unwrap();
        assert!(!set.matches("anything"));
    }
}

//! Path resolution for command targets.
//!
//! Every file command resolves against the session-fixed base directory;
//! absolute paths pass through unchanged.

use std::path::{Path, PathBuf};

/// Resolve a command path against the base directory.
#[must_use]
pub fn resolve_path(file_path: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_unchanged() {
        let result = resolve_path("/usr/bin/ls", Path::new("/work"));
        assert_eq!(result, PathBuf::from("/usr/bin/ls"));
    }

    #[test]
    fn relative_path_joined() {
        let result = resolve_path("src/main.rs", Path::new("/work/project"));
        assert_eq!(result, PathBuf::from("/work/project/src/main.rs"));
    }

    #[test]
    fn nested_relative_path() {
        let result = resolve_path("a/b/c.txt", Path::new("/base"));
        assert_eq!(result, PathBuf::from("/base/a/b/c.txt"));
    }
}

// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and build stages.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Only if both attempts fail do we give up.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    // Different absolute prefixes for the same directory show up on macOS
    // (/private/var vs /var); canonical forms line up.
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/proj"), Path::new("/proj/src/a.js")),
            Some("src/a.js".to_string())
        );
    }

    #[test]
    fn unrelated_paths_are_none() {
        assert_eq!(
            relative_str(Path::new("/proj-does-not-exist"), Path::new("/elsewhere/a.js")),
            None
        );
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        assert_eq!(
            absolutize(Path::new("/proj"), Path::new("/abs/x")),
            PathBuf::from("/abs/x")
        );
        assert_eq!(
            absolutize(Path::new("/proj"), Path::new("src/x")),
            PathBuf::from("/proj/src/x")
        );
    }
}

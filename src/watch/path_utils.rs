// src/watch/path_utils.rs

//! Path helpers for watcher log output. Purely lexical: nothing here
//! touches the filesystem.

use std::path::{Path, PathBuf};

/// `path` relative to `root`, with forward slashes. `None` if `path` is not
/// under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Short form for logs: relative to the first of `roots` that contains
/// `path`, the full path otherwise.
///
/// Callers pass the watched root and, when it differs, its canonical form,
/// resolved once up front. Some platforms report events under a different
/// absolute prefix than the one watched (macOS `/private/var/...`).
pub fn display_path(roots: &[PathBuf], path: &Path) -> String {
    roots
        .iter()
        .find_map(|root| relative_str(root, path))
        .unwrap_or_else(|| path.display().to_string())
}

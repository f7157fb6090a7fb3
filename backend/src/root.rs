//! Project-root discovery.

use std::fs;
use std::path::{Path, PathBuf};

use gmod_config::ROOT_SETTINGS_FILE;

const ROOT_MARKERS: &[&str] = &["stack.yaml", "cabal.project", ROOT_SETTINGS_FILE];

/// Nearest ancestor of `path` that looks like a project root.
///
/// A directory qualifies when it holds a `*.cabal` file or one of
/// `stack.yaml`, `cabal.project`, `.gmod.toml`. Falls back to the file's own
/// directory. The result is canonical when the path exists.
#[must_use]
pub fn project_root(path: &Path) -> PathBuf {
    let start = if path.is_dir() {
        path
    } else {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    };
    let start = canonical(start);

    start
        .ancestors()
        .find(|dir| is_project_root(dir))
        .map_or_else(|| start.clone(), Path::to_path_buf)
}

/// Canonical form of `path`, or `path` itself when it cannot be resolved.
#[must_use]
pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_project_root(dir: &Path) -> bool {
    ROOT_MARKERS.iter().any(|marker| dir.join(marker).is_file()) || has_cabal_file(dir)
}

fn has_cabal_file(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        path.extension().is_some_and(|ext| ext == "cabal") && path.is_file()
    })
}

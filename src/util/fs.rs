//! Filesystem utilities.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{glob, Pattern};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy `file` into `directory`, keeping its file name.
pub fn copy_into(file: &Path, directory: &Path) -> Result<PathBuf> {
    ensure_dir(directory)?;
    let name = file
        .file_name()
        .with_context(|| format!("cannot copy '{}': not a file", file.display()))?;
    let destination = directory.join(name);
    if destination != file {
        fs::copy(file, &destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                file.display(),
                destination.display()
            )
        })?;
    }
    Ok(destination)
}

/// Find files matching glob patterns relative to each of the base directories.
///
/// Base directories are escaped, so only the patterns themselves are globbed.
pub fn glob_files<S: AsRef<str>>(bases: &[PathBuf], patterns: &[S]) -> Result<BTreeSet<PathBuf>> {
    let mut results = BTreeSet::new();

    for base in bases {
        let escaped_base = Pattern::escape(&base.to_string_lossy());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let full_pattern = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);

            for entry in glob(&full_pattern)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?
            {
                match entry {
                    Ok(path) => {
                        if path.is_file() {
                            results.insert(path);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("glob error: {}", e);
                    }
                }
            }
        }
    }

    Ok(results)
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Deduplicate while keeping the first occurrence of every item.
pub fn unique<T: Clone + Ord>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

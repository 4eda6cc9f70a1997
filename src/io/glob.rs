//! Input path resolution.
//!
//! A job input may name a file, a directory, or a glob pattern:
//!
//! - a **file** is read as is;
//! - a **directory** contributes every regular file directly inside it, except
//!   names starting with `_` or `.` (job markers such as `_SUCCESS`, hidden files);
//! - anything else is expanded as a **glob** (`data/part-*`, `runs/**/*.gz`) and
//!   must match at least one file.
//!
//! Results are sorted so the input order, and with it the line numbers in error
//! reports, is deterministic.

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::{Path, PathBuf};

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// # Errors
/// Returns an error for an invalid pattern or an unreadable entry.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Expand a glob pattern, returning an error if no files are found.
///
/// # Errors
/// As [`expand_glob`], plus an error when nothing matches.
pub fn expand_glob_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = expand_glob(pattern)?;
    if files.is_empty() {
        bail!("no files found matching pattern: {pattern}");
    }
    Ok(files)
}

fn is_visible(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('_') && !n.starts_with('.'))
}

/// List the visible regular files of a directory, sorted.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        if path.is_file() && is_visible(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve job input arguments into the ordered list of files to read.
///
/// # Errors
/// Returns an error if an input matches no file or cannot be listed.
pub fn resolve_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            files.extend(list_dir(path)?);
        } else {
            files.extend(expand_glob_required(input)?);
        }
    }
    Ok(files)
}

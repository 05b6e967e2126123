//! File resolver module for the downloads tree
//!
//! This module provides the directory listings the reconciliation engine works
//! on: sorted file and folder names with hidden entries filtered out, and a
//! bounded recursive walk over all files below a folder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// Path is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read directory entry
    #[error("Failed to read directory entry: {0}")]
    ReadEntryFailed(#[from] io::Error),
}

/// Returns true for dot-files such as `.DS_Store` or partial downloads
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Returns true for sidecar files, which never count as media
pub(crate) fn is_metadata_file(name: &str) -> bool {
    name.contains("metadata")
}

/// Lists the names of all visible regular files in a directory, sorted
pub(crate) fn list_file_names(dir_path: &Path) -> Result<Vec<String>, FileResolverError> {
    list_names(dir_path, |path| path.is_file())
}

/// Lists the names of all visible subdirectories of a directory, sorted
pub(crate) fn list_directory_names(dir_path: &Path) -> Result<Vec<String>, FileResolverError> {
    list_names(dir_path, |path| path.is_dir())
}

fn list_names<F>(dir_path: &Path, keep: F) -> Result<Vec<String>, FileResolverError>
where
    F: Fn(&Path) -> bool,
{
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    let mut names = Vec::new();

    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;

        // Names that are not valid UTF-8 cannot carry server identifiers
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        if is_hidden(&name) || !keep(&entry.path()) {
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Walks all visible files below `dir_path` up to `max_depth` levels deep
///
/// The visitor receives each file's path and name and returns `true` to stop
/// the walk early. Returns whether the walk was stopped by the visitor.
pub(crate) fn walk_files<F>(
    dir_path: &Path,
    max_depth: usize,
    visitor: &mut F,
) -> Result<bool, FileResolverError>
where
    F: FnMut(&Path, &str) -> bool,
{
    walk_directory_recursive(dir_path, 1, max_depth, visitor)
}

/// Recursively walks a directory and hands every file to the visitor
fn walk_directory_recursive<F>(
    dir_path: &Path,
    depth: usize,
    max_depth: usize,
    visitor: &mut F,
) -> Result<bool, FileResolverError>
where
    F: FnMut(&Path, &str) -> bool,
{
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if is_hidden(&name) {
            continue;
        }

        if path.is_dir() {
            if depth < max_depth && walk_directory_recursive(&path, depth + 1, max_depth, visitor)? {
                return Ok(true);
            }
        } else if path.is_file() && visitor(&path, &name) {
            return Ok(true);
        }
    }

    Ok(false)
}

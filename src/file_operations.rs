use crate::file_resolver::{self, FileResolverError, is_metadata_file};
use crate::matching::GENERIC_MEDIA_PREFIX;
use crate::metadata::METADATA_FILE_NAME;
use crate::reconcile::SEASON_FOLDER_PREFIX;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// How deep `has_media_file` looks below an item folder
const MEDIA_SEARCH_DEPTH: usize = 3;

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The identifier does not name a single folder below the downloads root
    #[error("Invalid item identifier: {0:?}")]
    InvalidItemId(String),

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed { path: PathBuf, source: io::Error },

    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),
}

/// Resolves the folder of an item, refusing anything but a plain folder name
pub(crate) fn item_folder(root: &Path, item_id: &str) -> Result<PathBuf, FileOperationError> {
    let mut components = Path::new(item_id).components();

    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == item_id => Ok(root.join(item_id)),
        _ => Err(FileOperationError::InvalidItemId(item_id.to_string())),
    }
}

/// Removes the folder tree of one item
///
/// Returns `Ok(false)` if there was nothing to delete.
pub(crate) fn delete_item_folder(root: &Path, item_id: &str) -> Result<bool, FileOperationError> {
    let path = item_folder(root, item_id)?;

    if !path.exists() {
        return Ok(false);
    }

    let result = if path.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };
    result.map_err(|e| FileOperationError::RemoveFailed { path, source: e })?;

    Ok(true)
}

/// Removes every entry below the downloads root, returning how many were removed
pub(crate) fn delete_all_entries(root: &Path) -> Result<usize, FileOperationError> {
    if !root.exists() {
        return Ok(0);
    }

    let mut removed = 0;

    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| FileOperationError::RemoveFailed {
            path: path.clone(),
            source: e,
        })?;
        removed += 1;
    }

    Ok(removed)
}

/// Sums the sizes of all visible regular files below a folder
pub(crate) fn directory_size(path: &Path) -> Result<u64, FileOperationError> {
    let mut total = 0u64;
    let mut error = None;

    file_resolver::walk_files(path, usize::MAX, &mut |file: &Path, _: &str| {
        match fs::metadata(file) {
            Ok(metadata) => {
                total += metadata.len();
                false
            }
            Err(e) => {
                error = Some(e);
                true
            }
        }
    })?;

    match error {
        Some(e) => Err(FileOperationError::Io(e)),
        None => Ok(total),
    }
}

/// Lists item folders that look like finished downloads, sorted
///
/// A folder qualifies when it carries a sidecar or at least one season folder.
pub(crate) fn downloaded_item_ids(root: &Path) -> Result<Vec<String>, FileOperationError> {
    let folders = file_resolver::list_directory_names(root)?;

    Ok(folders
        .into_iter()
        .filter(|name| {
            let folder = root.join(name);
            folder.join(METADATA_FILE_NAME).is_file() || has_season_folder(&folder)
        })
        .collect())
}

fn has_season_folder(folder: &Path) -> bool {
    file_resolver::list_directory_names(folder)
        .map(|names| names.iter().any(|n| n.starts_with(SEASON_FOLDER_PREFIX)))
        .unwrap_or(false)
}

/// Checks whether an item folder holds a media file for the given variant
///
/// The variant defaults to the item itself when no media source is named.
/// Accepts the generic `Media.*` name, names starting with the media source,
/// and names containing the item identifier (with `-<mediaSourceId>` when a
/// media source was requested).
pub(crate) fn has_media_file(
    root: &Path,
    item_id: &str,
    media_source_id: Option<&str>,
) -> Result<bool, FileOperationError> {
    let folder = item_folder(root, item_id)?;
    if !folder.is_dir() {
        return Ok(false);
    }

    let normalized = media_source_id.unwrap_or(item_id);
    let versioned_suffix = format!("-{normalized}");

    let found = file_resolver::walk_files(&folder, MEDIA_SEARCH_DEPTH, &mut |_: &Path, name: &str| {
        if is_metadata_file(name) {
            return false;
        }
        name.starts_with(GENERIC_MEDIA_PREFIX)
            || name.starts_with(normalized)
            || (name.contains(item_id)
                && (media_source_id.is_none() || name.contains(&versioned_suffix)))
    })?;

    Ok(found)
}

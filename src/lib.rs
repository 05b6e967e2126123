//! Offline Shelf - Reconcile downloaded media into a browsable library
//!
//! This library scans a downloads folder written by a media client, pairs the
//! recorded metadata with the media files that actually made it to disk, and
//! produces deduplicated, sorted show and movie models ready for display.

mod config;
mod file_operations;
mod file_resolver;
mod library;
mod matching;
mod metadata;
mod reconcile;

#[cfg(test)]
mod test_support;

// Re-export error types
pub use config::ConfigError;
pub use file_operations::FileOperationError;
pub use file_resolver::FileResolverError;
pub use metadata::MetadataError;

// Re-export model types
pub use config::LibraryConfig;
pub use library::{
    DEFAULT_SEASON_NUMBER, DownloadedEpisode, DownloadedItems, DownloadedMovie, DownloadedSeason,
    DownloadedShow, DownloadedVersion,
};
pub use metadata::{BaseItem, DownloadMetadata, ItemKind, METADATA_FILE_NAME, VersionInfo};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Progress event emitted while scanning the downloads folder
///
/// These events allow library users to report progress or surface skipped
/// folders without parsing log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Scan started
    Started { root: PathBuf },

    /// Scanning a top-level item folder
    ScanningItem {
        index: usize,
        total: usize,
        item_id: String,
    },

    /// A season folder could not be read and contributes nothing
    SeasonSkipped { path: PathBuf, reason: String },

    /// A single-item folder contributes nothing
    ItemSkipped { item_id: String, reason: String },

    /// Scan complete
    Complete {
        show_count: usize,
        movie_count: usize,
    },
}

/// Top-level error type for Offline Shelf operations
#[derive(Debug, Error)]
pub enum OfflineShelfError {
    /// Error while deleting or measuring downloads
    #[error("File operation error: {0}")]
    FileOperation(#[from] FileOperationError),

    /// Error while resolving the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Read and delete access to one downloads folder
///
/// Every load rebuilds its result from disk; nothing is cached between calls,
/// so a library value can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct DownloadLibrary {
    config: LibraryConfig,
}

impl DownloadLibrary {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    fn root(&self) -> &Path {
        self.config.downloads_root()
    }

    /// Scans the downloads folder and returns everything playable
    ///
    /// Unreadable folders and broken sidecars are skipped; loading itself
    /// never fails. A missing downloads root yields an empty result.
    pub fn load_downloaded_items(&self) -> DownloadedItems {
        self.load_with_progress(|_| {})
    }

    /// Same as [`load_downloaded_items`](Self::load_downloaded_items), reporting progress
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use offline_shelf::{DownloadLibrary, LibraryConfig, ScanEvent};
    ///
    /// let library = DownloadLibrary::new(LibraryConfig::new("/data/Downloads"));
    /// let items = library.load_with_progress(|event| {
    ///     if let ScanEvent::SeasonSkipped { path, reason } = event {
    ///         eprintln!("Skipped {}: {}", path.display(), reason);
    ///     }
    /// });
    /// println!("{} shows, {} movies", items.shows.len(), items.movies.len());
    /// ```
    pub fn load_with_progress<F>(&self, mut progress_callback: F) -> DownloadedItems
    where
        F: FnMut(ScanEvent),
    {
        reconcile::load_downloaded_items(self.root(), &mut progress_callback)
    }

    /// Deletes the folder of one downloaded item
    ///
    /// Returns `false` if the identifier is not a plain folder name, if there
    /// is no such folder, or if removal failed. The in-memory library is not
    /// touched; use [`DownloadedItems::remove`] to update it.
    pub fn delete_item(&self, item_id: &str) -> bool {
        match file_operations::delete_item_folder(self.root(), item_id) {
            Ok(deleted) => {
                if deleted {
                    info!(item = %item_id, "deleted download");
                }
                deleted
            }
            Err(e) => {
                warn!(item = %item_id, error = %e, "failed to delete download");
                false
            }
        }
    }

    /// Deletes every download, returning how many entries were removed
    pub fn delete_all(&self) -> Result<usize, FileOperationError> {
        let removed = file_operations::delete_all_entries(self.root())?;
        info!(removed, "deleted all downloads");
        Ok(removed)
    }

    /// Lists the identifiers of all downloaded items, sorted
    pub fn downloaded_item_ids(&self) -> Vec<String> {
        file_operations::downloaded_item_ids(self.root()).unwrap_or_else(|e| {
            warn!(error = %e, "failed to list downloads");
            Vec::new()
        })
    }

    pub fn is_item_downloaded(&self, item_id: &str) -> bool {
        file_operations::item_folder(self.root(), item_id).is_ok_and(|path| path.is_dir())
    }

    /// Checks whether a media file for the item (or one of its variants) exists
    ///
    /// # Arguments
    ///
    /// * `item_id` - Identifier of the item folder
    /// * `media_source_id` - Variant to look for; defaults to the item itself
    pub fn has_media_file(&self, item_id: &str, media_source_id: Option<&str>) -> bool {
        file_operations::has_media_file(self.root(), item_id, media_source_id).unwrap_or_else(|e| {
            warn!(item = %item_id, error = %e, "failed to look for media file");
            false
        })
    }

    /// Reads the sidecar of a downloaded item
    ///
    /// Series have no item-level version list; for them the versions of all
    /// seasons are aggregated into one record.
    pub fn read_metadata(&self, item_id: &str) -> Option<DownloadMetadata> {
        let folder = file_operations::item_folder(self.root(), item_id).ok()?;
        reconcile::read_item_metadata(&folder)
    }

    /// Version rows recorded for an item, empty if nothing is known
    pub fn downloaded_versions(&self, item_id: &str) -> Vec<VersionInfo> {
        self.read_metadata(item_id)
            .map(|metadata| metadata.versions)
            .unwrap_or_default()
    }

    /// Bytes used by one item, or `None` if it cannot be measured
    pub fn download_size(&self, item_id: &str) -> Option<u64> {
        let folder = file_operations::item_folder(self.root(), item_id).ok()?;
        if !folder.is_dir() {
            return None;
        }
        measure(&folder)
    }

    /// Bytes used by all downloads, or `None` if they cannot be measured
    pub fn total_download_size(&self) -> Option<u64> {
        if !self.root().is_dir() {
            return Some(0);
        }
        measure(self.root())
    }
}

fn measure(path: &Path) -> Option<u64> {
    file_operations::directory_size(path)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "failed to measure download size"))
        .ok()
}

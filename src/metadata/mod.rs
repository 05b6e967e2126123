//! Sidecar metadata decoding
//!
//! Every downloaded item or season carries a `metadata.json` next to its media
//! files. It lists the downloaded versions and, for seasons, the item records
//! of the episodes that were downloaded.

mod item;

pub use item::{BaseItem, ItemKind};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the sidecar file inside an item or season folder
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Folder holding the pre-sidecar `Item.json` of older downloads
const LEGACY_METADATA_FOLDER: &str = "Metadata";
const LEGACY_ITEM_FILE_NAME: &str = "Item.json";

/// Errors that can occur while reading sidecar metadata
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The sidecar could not be read from disk
    #[error("Failed to read metadata file {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The sidecar is not valid metadata JSON
    #[error("Failed to decode metadata file {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One downloaded media variant of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Opaque identifier, unique within one sidecar's `versions`
    pub version_id: String,
    /// Container format of the media file (mp4, mkv, ...)
    pub container: String,
    /// Whether the media was downloaded without transcoding
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_source_id: Option<String>,
    /// Episode this version belongs to, when it was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    /// ISO-8601 timestamp of the download
    #[serde(default)]
    pub download_date: String,
    #[serde(default)]
    pub task_id: String,
}

impl VersionInfo {
    /// Builds a best-effort version for an episode that no version row links to.
    ///
    /// The episode identifier doubles as version and media source identifier
    /// so that filename matching can still find the episode's media file.
    pub fn synthesized(episode_id: &str) -> Self {
        Self {
            version_id: episode_id.to_string(),
            container: "mp4".to_string(),
            is_static: true,
            media_source_id: Some(episode_id.to_string()),
            episode_id: Some(episode_id.to_string()),
            download_date: String::new(),
            task_id: String::new(),
        }
    }

    /// Parses the download timestamp, if it is a valid RFC 3339 date
    pub fn downloaded_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.download_date).ok()
    }
}

/// Decoded contents of a `metadata.json` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    /// Template item; for seasons this is the most recently downloaded episode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<BaseItem>,
    /// Downloaded variants, in the order they were recorded
    pub versions: Vec<VersionInfo>,
    /// Episode records keyed by episode identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<HashMap<String, BaseItem>>,
}

impl DownloadMetadata {
    /// Reads and decodes the sidecar stored in `folder`
    pub fn read_from_folder(folder: &Path) -> Result<Self, MetadataError> {
        read_json(&folder.join(METADATA_FILE_NAME))
    }

    /// Returns true if the sidecar carries a non-empty episode table
    pub fn has_episode_table(&self) -> bool {
        self.episodes.as_ref().is_some_and(|episodes| !episodes.is_empty())
    }

    /// Looks up an episode record by identifier
    pub fn episode(&self, episode_id: &str) -> Option<&BaseItem> {
        self.episodes.as_ref()?.get(episode_id)
    }

    /// Returns the episode table sorted by identifier
    pub fn sorted_episodes(&self) -> Vec<(&str, &BaseItem)> {
        let mut episodes: Vec<(&str, &BaseItem)> = self
            .episodes
            .iter()
            .flatten()
            .map(|(id, item)| (id.as_str(), item))
            .collect();
        episodes.sort_by(|a, b| a.0.cmp(b.0));
        episodes
    }
}

/// Reads the `Metadata/Item.json` record written by older versions
pub fn read_legacy_item(folder: &Path) -> Result<BaseItem, MetadataError> {
    read_json(
        &folder
            .join(LEGACY_METADATA_FOLDER)
            .join(LEGACY_ITEM_FILE_NAME),
    )
}

fn read_json<T>(path: &Path) -> Result<T, MetadataError>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path).map_err(|e| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| MetadataError::DecodeFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

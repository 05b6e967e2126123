//! Single-item containers: movies and individually downloaded episodes

use super::{log_metadata_error, resolve_artwork};
use crate::file_resolver;
use crate::library::{DownloadedEpisode, DownloadedMovie, DownloadedVersion};
use crate::matching::{self, MediaQuery, item_image_steps};
use crate::metadata::{self, BaseItem, DownloadMetadata, MetadataError, VersionInfo};
use std::path::Path;
use tracing::debug;

/// What a single-item folder turned out to hold
#[derive(Debug)]
pub(super) enum SingleItem {
    Movie(DownloadedMovie),
    /// Episode downloaded on its own, to be merged into its series
    Episodes {
        series_id: String,
        series_title: Option<String>,
        episodes: Vec<DownloadedEpisode>,
    },
}

/// Reconciles one single-item folder
///
/// The error is a human-readable reason why the folder contributes nothing.
pub(super) fn scan_single_item(item_dir: &Path, folder_id: &str) -> Result<SingleItem, String> {
    let (item, versions) = read_descriptor(item_dir, folder_id)?;
    let file_names = file_resolver::list_file_names(item_dir).map_err(|e| e.to_string())?;

    let item_id = item.id.as_deref().unwrap_or(folder_id);
    let playable: Vec<(VersionInfo, String)> = versions
        .into_iter()
        .filter_map(|version| {
            let query = MediaQuery {
                media_source_id: version.media_source_id.as_deref(),
                item_id: Some(item_id),
            };
            let media = matching::resolve_media_file(&file_names, &query)?.to_string();
            Some((version, media))
        })
        .collect();

    if playable.is_empty() {
        debug!(item = %folder_id, "no playable version");
        return Err("no media file for any version".to_string());
    }

    let (primary_image, backdrop_image) =
        resolve_artwork(|kind| item_image_steps(item_dir, item_id, kind));

    if item.is_episode() {
        let series_id = item
            .series_id
            .clone()
            .unwrap_or_else(|| item_id.to_string());
        let episodes = playable
            .into_iter()
            .map(|(version_info, media)| DownloadedEpisode {
                episode_item: item.clone(),
                version_info,
                media_path: item_dir.join(media),
                primary_image: primary_image.clone(),
                backdrop_image: backdrop_image.clone(),
            })
            .collect();

        return Ok(SingleItem::Episodes {
            series_id,
            series_title: item.series_name.clone(),
            episodes,
        });
    }

    let versions = playable
        .into_iter()
        .map(|(version_info, media)| DownloadedVersion {
            version_info,
            media_path: item_dir.join(media),
        })
        .collect();

    Ok(SingleItem::Movie(DownloadedMovie {
        id: folder_id.to_string(),
        item,
        primary_image,
        backdrop_image,
        versions,
    }))
}

/// Finds the item descriptor and its version rows
///
/// The sidecar's template item wins; older downloads keep the descriptor in
/// `Metadata/Item.json` and have no version rows, in which case a single
/// version standing for the item itself is assumed.
fn read_descriptor(
    item_dir: &Path,
    folder_id: &str,
) -> Result<(BaseItem, Vec<VersionInfo>), String> {
    let (sidecar_item, versions) = match DownloadMetadata::read_from_folder(item_dir) {
        Ok(sidecar) => (sidecar.item, sidecar.versions),
        Err(e @ MetadataError::DecodeFailed { .. }) => {
            log_metadata_error(&e);
            return Err(e.to_string());
        }
        Err(e) => {
            log_metadata_error(&e);
            (None, Vec::new())
        }
    };

    let item = match sidecar_item {
        Some(item) => item,
        None => metadata::read_legacy_item(item_dir).map_err(|e| {
            log_metadata_error(&e);
            e.to_string()
        })?,
    };

    let versions = if versions.is_empty() {
        vec![VersionInfo::synthesized(item.id.as_deref().unwrap_or(folder_id))]
    } else {
        versions
    };

    Ok((item, versions))
}

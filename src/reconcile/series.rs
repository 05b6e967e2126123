//! Series containers: one folder per series, one `Season-*` folder per season

use super::{log_metadata_error, resolve_artwork};
use crate::ScanEvent;
use crate::file_resolver;
use crate::library::{self, DownloadedEpisode, DownloadedShow};
use crate::matching::{
    self, EpisodeImageQuery, IdentityClues, MediaQuery, episode_image_steps, item_image_steps,
};
use crate::metadata::{BaseItem, DownloadMetadata, VersionInfo};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything found for one series before deduplication and grouping
#[derive(Debug)]
pub(super) struct ShowScan {
    pub id: String,
    /// Title from the series-level sidecar, if there is one
    pub display_title: Option<String>,
    pub primary_image: Option<PathBuf>,
    pub backdrop_image: Option<PathBuf>,
    pub episodes: Vec<DownloadedEpisode>,
}

impl ShowScan {
    /// Finishes the show, or drops it if no playable episode survived
    pub(super) fn into_show(self) -> Option<DownloadedShow> {
        let episodes = library::dedup_episodes(self.episodes);
        if episodes.is_empty() {
            debug!(series = %self.id, "no playable episodes");
            return None;
        }

        let display_title = self
            .display_title
            .or_else(|| episodes.iter().find_map(|e| e.episode_item.series_name.clone()))
            .unwrap_or_else(|| self.id.clone());

        Some(DownloadedShow {
            id: self.id,
            display_title,
            primary_image: self.primary_image,
            backdrop_image: self.backdrop_image,
            seasons: library::group_into_seasons(episodes),
        })
    }
}

/// Fixed locations shared by every episode of one season
struct SeasonContext<'a> {
    series_dir: &'a Path,
    series_id: &'a str,
    season_dir: PathBuf,
    file_names: Vec<String>,
}

impl SeasonContext<'_> {
    /// Pairs an episode record with a version, if its media file is present
    fn build_episode(
        &self,
        item: &BaseItem,
        fallback_id: &str,
        version: &VersionInfo,
    ) -> Option<DownloadedEpisode> {
        let episode_id = item.id.as_deref().unwrap_or(fallback_id);
        let query = MediaQuery {
            media_source_id: version.media_source_id.as_deref(),
            item_id: Some(episode_id),
        };

        let Some(media_name) = matching::resolve_media_file(&self.file_names, &query) else {
            debug!(
                episode = %episode_id,
                version = %version.version_id,
                "no media file for version"
            );
            return None;
        };

        let image_query = EpisodeImageQuery {
            season_dir: &self.season_dir,
            series_dir: self.series_dir,
            series_id: self.series_id,
            episode_id: Some(episode_id),
            season_id: item.season_id.as_deref(),
        };
        let (primary_image, backdrop_image) =
            resolve_artwork(|kind| episode_image_steps(&image_query, kind));

        Some(DownloadedEpisode {
            episode_item: item.clone(),
            version_info: version.clone(),
            media_path: self.season_dir.join(media_name),
            primary_image,
            backdrop_image,
        })
    }
}

/// Scans all season folders of a series
pub(super) fn scan_series(
    series_dir: &Path,
    series_id: &str,
    season_folders: &[String],
    progress: &mut dyn FnMut(ScanEvent),
) -> ShowScan {
    let display_title = match DownloadMetadata::read_from_folder(series_dir) {
        Ok(metadata) => metadata.display_title,
        Err(e) => {
            log_metadata_error(&e);
            None
        }
    };
    let (primary_image, backdrop_image) =
        resolve_artwork(|kind| item_image_steps(series_dir, series_id, kind));

    let mut episodes = Vec::new();

    for folder in season_folders {
        let season_dir = series_dir.join(folder);
        match scan_season(series_dir, series_id, season_dir.clone()) {
            Ok(found) => episodes.extend(found),
            Err(reason) => {
                warn!(season = %season_dir.display(), %reason, "skipping season");
                progress(ScanEvent::SeasonSkipped {
                    path: season_dir,
                    reason,
                });
            }
        }
    }

    ShowScan {
        id: series_id.to_string(),
        display_title,
        primary_image,
        backdrop_image,
        episodes,
    }
}

/// Reconciles one season folder
///
/// Fails only when the folder or its sidecar cannot be read; individual
/// versions without media are silently left out.
fn scan_season(
    series_dir: &Path,
    series_id: &str,
    season_dir: PathBuf,
) -> Result<Vec<DownloadedEpisode>, String> {
    let metadata = DownloadMetadata::read_from_folder(&season_dir).map_err(|e| e.to_string())?;
    let file_names = file_resolver::list_file_names(&season_dir).map_err(|e| e.to_string())?;

    let context = SeasonContext {
        series_dir,
        series_id,
        season_dir,
        file_names,
    };

    let episodes = if metadata.has_episode_table() {
        episodes_from_table(&context, &metadata)
    } else {
        episodes_from_versions(&context, &metadata)
    };

    debug!(
        season = %context.season_dir.display(),
        count = episodes.len(),
        "reconciled season"
    );
    Ok(episodes)
}

/// Dictionary path: every record in the episode table gets one version
///
/// Version rows no record claims are attributed to the template item, but
/// only when the template is itself an episode.
fn episodes_from_table(
    context: &SeasonContext<'_>,
    metadata: &DownloadMetadata,
) -> Vec<DownloadedEpisode> {
    let table = metadata.sorted_episodes();
    let keys: HashSet<&str> = table.iter().map(|(key, _)| *key).collect();
    let mut episodes = Vec::new();

    for (key, item) in &table {
        let version = match matching::match_version(&metadata.versions, key) {
            Some(index) => metadata.versions[index].clone(),
            None => VersionInfo::synthesized(key),
        };
        episodes.extend(context.build_episode(item, key, &version));
    }

    let Some(template) = metadata.item.as_ref().filter(|item| item.is_episode()) else {
        return episodes;
    };

    let orphans = metadata.versions.iter().filter(|version| {
        ![
            version.episode_id.as_deref(),
            Some(version.version_id.as_str()),
            version.media_source_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|id| keys.contains(id))
    });

    for version in orphans {
        episodes.extend(context.build_episode(template, &version.version_id, version));
    }

    episodes
}

/// Legacy path: identify each version row on its own
///
/// There is no episode table here, so a row is kept only if one of its
/// identity candidates is exactly the template item's own identifier.
fn episodes_from_versions(
    context: &SeasonContext<'_>,
    metadata: &DownloadMetadata,
) -> Vec<DownloadedEpisode> {
    let mut episodes = Vec::new();

    for version in &metadata.versions {
        let clues = IdentityClues {
            version,
            inferred_id: matching::infer_episode_id(&context.file_names, version),
        };

        let resolved = matching::identity_candidates(&clues)
            .into_iter()
            .find_map(|candidate| {
                metadata
                    .item
                    .as_ref()
                    .filter(|item| item.id.as_deref() == Some(candidate))
                    .map(|item| (candidate, item))
            });

        match resolved {
            Some((episode_id, item)) => {
                episodes.extend(context.build_episode(item, episode_id, version));
            }
            None => debug!(version = %version.version_id, "version matches no known episode"),
        }
    }

    episodes
}

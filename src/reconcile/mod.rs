//! Download reconciliation
//!
//! Walks the downloads root and rebuilds the presentation models from what is
//! actually on disk. Sidecar metadata says what was downloaded; the files in
//! each folder decide what is playable. Every failure is local: an unreadable
//! folder or a broken sidecar only removes that folder's contribution.

mod series;
mod single;

use crate::ScanEvent;
use crate::file_resolver::{self, FileResolverError};
use crate::library::{
    self, DownloadedEpisode, DownloadedItems, DownloadedMovie, DownloadedShow,
};
use crate::matching::{self, ImageKind, ImageStep};
use crate::metadata::{DownloadMetadata, MetadataError};
use series::ShowScan;
use single::SingleItem;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name prefix of season folders inside a series folder
pub(crate) const SEASON_FOLDER_PREFIX: &str = "Season-";

/// Scans the downloads root and builds the complete downloads library
pub(crate) fn load_downloaded_items(
    root: &Path,
    progress: &mut dyn FnMut(ScanEvent),
) -> DownloadedItems {
    progress(ScanEvent::Started {
        root: root.to_path_buf(),
    });

    let item_folders = match file_resolver::list_directory_names(root) {
        Ok(folders) => folders,
        Err(FileResolverError::NotADirectory(_)) => {
            debug!(root = %root.display(), "downloads root does not exist");
            Vec::new()
        }
        Err(e) => {
            warn!(root = %root.display(), error = %e, "failed to read downloads root");
            Vec::new()
        }
    };

    let mut shows: BTreeMap<String, ShowScan> = BTreeMap::new();
    let mut movies: Vec<DownloadedMovie> = Vec::new();
    let mut standalone: Vec<(String, Option<String>, Vec<DownloadedEpisode>)> = Vec::new();

    for (index, item_id) in item_folders.iter().enumerate() {
        progress(ScanEvent::ScanningItem {
            index,
            total: item_folders.len(),
            item_id: item_id.clone(),
        });

        let item_dir = root.join(item_id);
        let season_folders = match season_folder_names(&item_dir) {
            Ok(folders) => folders,
            Err(e) => {
                warn!(item = %item_id, error = %e, "failed to read item folder");
                progress(ScanEvent::ItemSkipped {
                    item_id: item_id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !season_folders.is_empty() {
            let scan = series::scan_series(&item_dir, item_id, &season_folders, progress);
            shows.insert(item_id.clone(), scan);
            continue;
        }

        match single::scan_single_item(&item_dir, item_id) {
            Ok(SingleItem::Movie(movie)) => movies.push(movie),
            Ok(SingleItem::Episodes {
                series_id,
                series_title,
                episodes,
            }) => standalone.push((series_id, series_title, episodes)),
            Err(reason) => progress(ScanEvent::ItemSkipped {
                item_id: item_id.clone(),
                reason,
            }),
        }
    }

    // Standalone episode downloads join the show of their series
    for (series_id, series_title, episodes) in standalone {
        let primary_image = episodes.first().and_then(|e| e.primary_image.clone());
        let backdrop_image = episodes.first().and_then(|e| e.backdrop_image.clone());
        let scan = shows.entry(series_id.clone()).or_insert_with(|| ShowScan {
            id: series_id,
            display_title: series_title,
            primary_image,
            backdrop_image,
            episodes: Vec::new(),
        });
        scan.episodes.extend(episodes);
    }

    let mut shows: Vec<DownloadedShow> = shows
        .into_values()
        .filter_map(ShowScan::into_show)
        .collect();
    library::sort_shows(&mut shows);
    library::sort_movies(&mut movies);

    info!(
        shows = shows.len(),
        movies = movies.len(),
        "loaded downloaded items"
    );
    progress(ScanEvent::Complete {
        show_count: shows.len(),
        movie_count: movies.len(),
    });

    DownloadedItems { shows, movies }
}

/// Lists the season folders of an item folder, sorted by name
fn season_folder_names(item_dir: &Path) -> Result<Vec<String>, FileResolverError> {
    Ok(file_resolver::list_directory_names(item_dir)?
        .into_iter()
        .filter(|name| name.starts_with(SEASON_FOLDER_PREFIX))
        .collect())
}

/// Reads the sidecar of an item, aggregating season sidecars for series
///
/// Series folders have no item-level version list of their own; their
/// versions are collected from every decodable season sidecar. Any decodable
/// item-level sidecar is returned as is when there are no seasons to collect.
pub(crate) fn read_item_metadata(item_dir: &Path) -> Option<DownloadMetadata> {
    let sidecar = DownloadMetadata::read_from_folder(item_dir)
        .inspect_err(log_metadata_error)
        .ok();
    let season_folders = season_folder_names(item_dir).unwrap_or_default();

    if season_folders.is_empty() || sidecar.as_ref().is_some_and(|m| !m.versions.is_empty()) {
        return sidecar;
    }

    let mut versions = Vec::new();
    let mut template = None;

    for folder in &season_folders {
        match DownloadMetadata::read_from_folder(&item_dir.join(folder)) {
            Ok(season) => {
                versions.extend(season.versions);
                if template.is_none() {
                    template = season.item;
                }
            }
            Err(e) => log_metadata_error(&e),
        }
    }

    if versions.is_empty() {
        return sidecar;
    }

    let display_title = template
        .as_ref()
        .and_then(|item| item.series_name.clone())
        .unwrap_or_else(|| "Unknown Series".to_string());

    Some(DownloadMetadata {
        item_id: item_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        item_type: Some("Series".to_string()),
        display_title: Some(display_title),
        item: template,
        versions,
        episodes: None,
    })
}

/// Logs a sidecar failure; a missing sidecar is expected and only traced
pub(crate) fn log_metadata_error(error: &MetadataError) {
    match error {
        MetadataError::ReadFailed { source, .. } if source.kind() == io::ErrorKind::NotFound => {
            debug!(error = %error, "no metadata sidecar");
        }
        _ => warn!(error = %error, "skipping unreadable metadata sidecar"),
    }
}

/// Walks an image lookup chain and returns the first file found
///
/// A missing image folder counts as "no image" for that step.
pub(crate) fn resolve_image(steps: &[ImageStep]) -> Option<PathBuf> {
    for step in steps {
        match file_resolver::list_file_names(&step.folder) {
            Ok(names) => {
                if let Some(name) = matching::find_with_prefix(&names, &step.prefix) {
                    return Some(step.folder.join(name));
                }
            }
            Err(e) => debug!(error = %e, prefix = %step.prefix, "image folder unavailable"),
        }
    }
    None
}

/// Resolves primary and backdrop artwork with the given lookup chain
pub(crate) fn resolve_artwork<F>(steps_for: F) -> (Option<PathBuf>, Option<PathBuf>)
where
    F: Fn(ImageKind) -> Vec<ImageStep>,
{
    (
        resolve_image(&steps_for(ImageKind::Primary)),
        resolve_image(&steps_for(ImageKind::Backdrop)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        Fixture, episode_item, movie_item, version_for_episode, version_for_movie,
    };
    use serde_json::json;

    fn load(fixture: &Fixture) -> DownloadedItems {
        load_downloaded_items(fixture.root(), &mut |_| {})
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let fixture = Fixture::new();
        let items = load_downloaded_items(&fixture.root().join("absent"), &mut |_| {});
        assert!(items.is_empty());
    }

    #[test]
    fn test_pilot_with_media_file() {
        let fixture = Fixture::new();
        let season = fixture.season("S", 1);
        fixture.write_metadata(
            &season,
            json!({
                "versions": [version_for_episode("v1", "E1", None)],
                "episodes": { "E1": episode_item("E1", "Pilot", 1, 1) }
            }),
        );
        fixture.touch(&season, "E1-v1.mp4");

        let items = load(&fixture);
        assert_eq!(items.shows.len(), 1);
        let episodes: Vec<&DownloadedEpisode> = items.shows[0].episodes().collect();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].display_title(), "Pilot");
        assert_eq!(episodes[0].media_path, season.join("E1-v1.mp4"));
        assert_eq!(episodes[0].id(), "E1:v1");
    }

    #[test]
    fn test_pilot_without_media_file() {
        let fixture = Fixture::new();
        let season = fixture.season("S", 1);
        fixture.write_metadata(
            &season,
            json!({
                "versions": [version_for_episode("v1", "E1", None)],
                "episodes": { "E1": episode_item("E1", "Pilot", 1, 1) }
            }),
        );

        let items = load(&fixture);
        assert!(items.shows.is_empty());
    }

    #[test]
    fn test_movie_with_two_versions() {
        let fixture = Fixture::new();
        let movie = fixture.item_dir("M1");
        fixture.write_metadata(
            &movie,
            json!({
                "item": movie_item("M1", "The Movie"),
                "versions": [version_for_movie("1080p"), version_for_movie("720p")]
            }),
        );
        fixture.touch(&movie, "M1-1080p.mp4");
        fixture.touch(&movie, "M1-720p.mp4");

        let items = load(&fixture);
        assert_eq!(items.movies.len(), 1);
        let movie = &items.movies[0];
        assert_eq!(movie.versions.len(), 2);
        assert_eq!(movie.versions[0].version_info.version_id, "1080p");
        assert!(movie.versions[0].media_path.ends_with("M1-1080p.mp4"));
        assert!(movie.versions[1].media_path.ends_with("M1-720p.mp4"));
    }

    #[test]
    fn test_malformed_season_does_not_abort_siblings() {
        let fixture = Fixture::new();
        let broken = fixture.season("S", 1);
        fixture.write_raw(&broken, "metadata.json", "{ \"versions\": [");
        fixture.touch(&broken, "E1-v1.mp4");

        let season = fixture.season("S", 2);
        fixture.write_metadata(
            &season,
            json!({
                "versions": [version_for_episode("v2", "E2", None)],
                "episodes": { "E2": episode_item("E2", "Second Season", 2, 1) }
            }),
        );
        fixture.touch(&season, "E2-v2.mp4");

        let mut skipped = Vec::new();
        let items = load_downloaded_items(fixture.root(), &mut |event| {
            if let ScanEvent::SeasonSkipped { path, .. } = event {
                skipped.push(path);
            }
        });

        assert_eq!(skipped, vec![broken]);
        let show = items.show("S").unwrap();
        assert_eq!(show.seasons.len(), 1);
        assert_eq!(show.seasons[0].season_number, 2);
    }

    #[test]
    fn test_load_is_idempotent() {
        let fixture = Fixture::new();
        let season = fixture.season("S", 1);
        fixture.write_metadata(
            &season,
            json!({
                "versions": [
                    version_for_episode("v1", "E1", None),
                    version_for_episode("v2", "E2", None)
                ],
                "episodes": {
                    "E1": episode_item("E1", "One", 1, 1),
                    "E2": episode_item("E2", "Two", 1, 2)
                }
            }),
        );
        fixture.touch(&season, "E1-v1.mp4");
        fixture.touch(&season, "E2-v2.mp4");

        let movie = fixture.item_dir("M1");
        fixture.write_metadata(
            &movie,
            json!({ "item": movie_item("M1", "Film"), "versions": [version_for_movie("hd")] }),
        );
        fixture.touch(&movie, "M1-hd.mkv");

        assert_eq!(load(&fixture), load(&fixture));
    }

    #[test]
    fn test_shows_and_movies_sorted_by_title() {
        let fixture = Fixture::new();
        for (series, title) in [("s-a", "Zebra Show"), ("s-b", "Alpha Show")] {
            let season = fixture.season(series, 1);
            let mut item = episode_item("E1", "Pilot", 1, 1);
            item["SeriesName"] = json!(title);
            fixture.write_metadata(
                &season,
                json!({
                    "versions": [version_for_episode("v1", "E1", None)],
                    "episodes": { "E1": item }
                }),
            );
            fixture.touch(&season, "E1-v1.mp4");
        }
        for (id, title) in [("m-a", "Zulu"), ("m-b", "Bravo")] {
            let movie = fixture.item_dir(id);
            fixture.write_metadata(
                &movie,
                json!({ "item": movie_item(id, title), "versions": [version_for_movie("hd")] }),
            );
            fixture.touch(&movie, &format!("{id}-hd.mp4"));
        }

        let items = load(&fixture);
        let shows: Vec<&str> = items.shows.iter().map(|s| s.display_title.as_str()).collect();
        let movies: Vec<&str> = items.movies.iter().map(|m| m.display_title()).collect();
        assert_eq!(shows, vec!["Alpha Show", "Zebra Show"]);
        assert_eq!(movies, vec!["Bravo", "Zulu"]);
    }

    #[test]
    fn test_standalone_episode_joins_series() {
        let fixture = Fixture::new();
        let season = fixture.season("S", 1);
        fixture.write_metadata(
            &season,
            json!({
                "versions": [version_for_episode("v1", "E1", None)],
                "episodes": { "E1": episode_item("E1", "One", 1, 1) }
            }),
        );
        fixture.touch(&season, "E1-v1.mp4");

        let standalone = fixture.item_dir("E5");
        let mut item = episode_item("E5", "Five", 1, 5);
        item["SeriesId"] = json!("S");
        fixture.write_metadata(
            &standalone,
            json!({ "item": item, "versions": [version_for_movie("v5")] }),
        );
        fixture.touch(&standalone, "E5-v5.mp4");

        let items = load(&fixture);
        assert_eq!(items.shows.len(), 1);
        let titles: Vec<&str> = items.shows[0].episodes().map(|e| e.display_title()).collect();
        assert_eq!(titles, vec!["One", "Five"]);
        assert!(items.movies.is_empty());
    }

    #[test]
    fn test_read_item_metadata_aggregates_seasons() {
        let fixture = Fixture::new();
        for (number, episode) in [(1, "E1"), (2, "E2")] {
            let season = fixture.season("S", number);
            let mut item = episode_item(episode, "Ep", number, 1);
            item["SeriesName"] = json!("Aggregated");
            fixture.write_metadata(
                &season,
                json!({
                    "item": item,
                    "versions": [version_for_episode(&format!("v{number}"), episode, None)]
                }),
            );
        }

        let metadata = read_item_metadata(&fixture.root().join("S")).unwrap();
        assert_eq!(metadata.versions.len(), 2);
        assert_eq!(metadata.display_title.as_deref(), Some("Aggregated"));
        assert_eq!(metadata.item_type.as_deref(), Some("Series"));

        assert!(read_item_metadata(&fixture.root().join("missing")).is_none());
    }

    #[test]
    fn test_read_item_metadata_keeps_sidecar_without_versions() {
        let fixture = Fixture::new();
        let movie = fixture.item_dir("M1");
        fixture.write_metadata(
            &movie,
            json!({ "item": movie_item("M1", "Film"), "versions": [] }),
        );

        let metadata = read_item_metadata(&movie).unwrap();
        assert!(metadata.versions.is_empty());
        assert_eq!(metadata.item.unwrap().display_title(), "Film");

        assert!(read_item_metadata(&fixture.item_dir("empty")).is_none());
    }
}

//! Presentation models for downloaded media
//!
//! These are the read-only structures screens render. They are rebuilt from
//! the filesystem on every load and are never updated in place; callers swap
//! a whole `DownloadedItems` for a new one.

use crate::metadata::{BaseItem, VersionInfo};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Season assumed for episodes whose record carries no season number
pub const DEFAULT_SEASON_NUMBER: i32 = 1;

/// Placeholder for episode records without an identifier
const UNIDENTIFIED: &str = "unidentified";

/// A locally playable episode variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedEpisode {
    /// Item record of the episode
    pub episode_item: BaseItem,
    /// The downloaded variant this entry plays
    pub version_info: VersionInfo,
    /// Media file on disk
    pub media_path: PathBuf,
    pub primary_image: Option<PathBuf>,
    pub backdrop_image: Option<PathBuf>,
}

impl DownloadedEpisode {
    /// Identity of this entry, unique across variants of the same episode
    pub fn id(&self) -> String {
        format!(
            "{}:{}",
            self.episode_item.id.as_deref().unwrap_or(UNIDENTIFIED),
            self.version_info.version_id
        )
    }

    pub fn season_number(&self) -> Option<i32> {
        self.episode_item.parent_index_number
    }

    pub fn episode_number(&self) -> Option<i32> {
        self.episode_item.index_number
    }

    pub fn display_title(&self) -> &str {
        self.episode_item.display_title()
    }
}

/// Downloaded episodes of one season, in playback order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedSeason {
    pub season_number: i32,
    pub episodes: Vec<DownloadedEpisode>,
}

/// A series with at least one playable downloaded episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedShow {
    /// Series identifier (the series folder name)
    pub id: String,
    pub display_title: String,
    pub primary_image: Option<PathBuf>,
    pub backdrop_image: Option<PathBuf>,
    /// Seasons in ascending order
    pub seasons: Vec<DownloadedSeason>,
}

impl DownloadedShow {
    /// Total number of episode entries across all seasons
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|season| season.episodes.len()).sum()
    }

    /// Iterates over all episodes, season by season
    pub fn episodes(&self) -> impl Iterator<Item = &DownloadedEpisode> {
        self.seasons.iter().flat_map(|season| season.episodes.iter())
    }
}

/// One playable variant of a movie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedVersion {
    pub version_info: VersionInfo,
    pub media_path: PathBuf,
}

/// A movie (or other single item) with its downloaded variants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedMovie {
    /// Item identifier (the item folder name)
    pub id: String,
    pub item: BaseItem,
    pub primary_image: Option<PathBuf>,
    pub backdrop_image: Option<PathBuf>,
    /// Variants in the order they were downloaded
    pub versions: Vec<DownloadedVersion>,
}

impl DownloadedMovie {
    pub fn display_title(&self) -> &str {
        self.item.display_title()
    }
}

/// Everything a single load found on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DownloadedItems {
    /// Shows sorted by title
    pub shows: Vec<DownloadedShow>,
    /// Movies sorted by title
    pub movies: Vec<DownloadedMovie>,
}

impl DownloadedItems {
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty() && self.movies.is_empty()
    }

    /// Number of playable entries: every episode plus every movie
    pub fn item_count(&self) -> usize {
        self.shows.iter().map(DownloadedShow::episode_count).sum::<usize>() + self.movies.len()
    }

    pub fn show(&self, id: &str) -> Option<&DownloadedShow> {
        self.shows.iter().find(|show| show.id == id)
    }

    pub fn movie(&self, id: &str) -> Option<&DownloadedMovie> {
        self.movies.iter().find(|movie| movie.id == id)
    }

    /// Drops every entity belonging to `id` after a successful delete
    ///
    /// `id` may name a show, a movie or a single episode. Seasons and shows
    /// left without episodes are removed as well. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = (self.shows.len(), self.movies.len(), self.item_count());

        self.movies.retain(|movie| movie.id != id);
        self.shows.retain(|show| show.id != id);

        for show in &mut self.shows {
            for season in &mut show.seasons {
                season
                    .episodes
                    .retain(|episode| episode.episode_item.id.as_deref() != Some(id));
            }
            show.seasons.retain(|season| !season.episodes.is_empty());
        }
        self.shows.retain(|show| !show.seasons.is_empty());

        before != (self.shows.len(), self.movies.len(), self.item_count())
    }
}

/// Key deciding whether two episode entries describe the same episode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EpisodeKey {
    Id(String),
    /// Fallback for records without an identifier: (season, episode number)
    Position(Option<i32>, Option<i32>),
}

impl EpisodeKey {
    fn of(item: &BaseItem) -> Self {
        match &item.id {
            Some(id) => EpisodeKey::Id(id.clone()),
            None => EpisodeKey::Position(item.parent_index_number, item.index_number),
        }
    }
}

/// Keeps the first entry for each episode and discards later duplicates
pub(crate) fn dedup_episodes(episodes: Vec<DownloadedEpisode>) -> Vec<DownloadedEpisode> {
    let mut seen = HashSet::new();
    episodes
        .into_iter()
        .filter(|episode| seen.insert(EpisodeKey::of(&episode.episode_item)))
        .collect()
}

/// Playback order within a season
///
/// Numbered episodes come first by number, then unnumbered ones; title breaks
/// every remaining tie. A numbered episode always sorts before an unnumbered
/// one, whatever their titles, so the order stays total.
pub(crate) fn compare_episodes(a: &DownloadedEpisode, b: &DownloadedEpisode) -> Ordering {
    match (a.episode_number(), b.episode_number()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.display_title().cmp(b.display_title()))
}

/// Groups episodes into seasons (ascending) sorted in playback order
pub(crate) fn group_into_seasons(episodes: Vec<DownloadedEpisode>) -> Vec<DownloadedSeason> {
    let mut grouped: BTreeMap<i32, Vec<DownloadedEpisode>> = BTreeMap::new();

    for episode in episodes {
        let season_number = episode.season_number().unwrap_or(DEFAULT_SEASON_NUMBER);
        grouped.entry(season_number).or_default().push(episode);
    }

    grouped
        .into_iter()
        .map(|(season_number, mut episodes)| {
            episodes.sort_by(compare_episodes);
            DownloadedSeason {
                season_number,
                episodes,
            }
        })
        .collect()
}

/// Sorts shows by title, using the identifier to keep equal titles stable
pub(crate) fn sort_shows(shows: &mut [DownloadedShow]) {
    shows.sort_by(|a, b| {
        a.display_title
            .cmp(&b.display_title)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Sorts movies by title, using the identifier to keep equal titles stable
pub(crate) fn sort_movies(movies: &mut [DownloadedMovie]) {
    movies.sort_by(|a, b| {
        a.display_title()
            .cmp(b.display_title())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(id: Option<&str>, season: Option<i32>, number: Option<i32>, title: &str) -> DownloadedEpisode {
        DownloadedEpisode {
            episode_item: BaseItem {
                id: id.map(str::to_string),
                name: Some(title.to_string()),
                parent_index_number: season,
                index_number: number,
                ..BaseItem::default()
            },
            version_info: VersionInfo::synthesized(id.unwrap_or("none")),
            media_path: PathBuf::from(format!("/media/{title}.mp4")),
            primary_image: None,
            backdrop_image: None,
        }
    }

    fn titles(season: &DownloadedSeason) -> Vec<&str> {
        season.episodes.iter().map(|e| e.display_title()).collect()
    }

    #[test]
    fn test_episode_identity() {
        let e = episode(Some("E1"), Some(1), Some(1), "Pilot");
        assert_eq!(e.id(), "E1:E1");

        let anonymous = episode(None, Some(1), Some(1), "Pilot");
        assert_eq!(anonymous.id(), "unidentified:none");
    }

    #[test]
    fn test_dedup_by_identifier_keeps_first() {
        let mut second_variant = episode(Some("E1"), Some(1), Some(1), "Pilot");
        second_variant.version_info.version_id = "v2".to_string();

        let result = dedup_episodes(vec![
            episode(Some("E1"), Some(1), Some(1), "Pilot"),
            second_variant,
            episode(Some("E2"), Some(1), Some(2), "Second"),
        ]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].version_info.version_id, "E1");
    }

    #[test]
    fn test_dedup_without_identifier_uses_position() {
        let result = dedup_episodes(vec![
            episode(None, Some(1), Some(1), "First copy"),
            episode(None, Some(1), Some(1), "Second copy"),
            episode(None, Some(2), Some(1), "Other season"),
        ]);

        let kept: Vec<&str> = result.iter().map(|e| e.display_title()).collect();
        assert_eq!(kept, vec!["First copy", "Other season"]);
    }

    #[test]
    fn test_group_into_seasons_sorts_episodes() {
        let seasons = group_into_seasons(vec![
            episode(Some("a"), Some(2), Some(1), "S2E1"),
            episode(Some("b"), Some(1), Some(3), "Three"),
            episode(Some("c"), None, Some(2), "Two"),
            episode(Some("d"), Some(1), None, "Bonus"),
            episode(Some("e"), Some(1), Some(1), "One"),
            episode(Some("f"), Some(1), None, "Alpha extra"),
        ]);

        let numbers: Vec<i32> = seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(titles(&seasons[0]), vec!["One", "Two", "Three", "Alpha extra", "Bonus"]);
        assert_eq!(titles(&seasons[1]), vec!["S2E1"]);
    }

    #[test]
    fn test_numbered_before_unnumbered_regardless_of_title() {
        let seasons = group_into_seasons(vec![
            episode(Some("a"), Some(1), None, "Alpha"),
            episode(Some("b"), Some(1), Some(1), "Zulu"),
        ]);
        assert_eq!(titles(&seasons[0]), vec!["Zulu", "Alpha"]);
    }

    #[test]
    fn test_equal_numbers_fall_back_to_title() {
        let seasons = group_into_seasons(vec![
            episode(Some("a"), Some(1), Some(1), "Zulu"),
            episode(Some("b"), Some(1), Some(1), "Alpha"),
        ]);
        assert_eq!(titles(&seasons[0]), vec!["Alpha", "Zulu"]);
    }

    #[test]
    fn test_remove_episode_show_and_movie() {
        let show = DownloadedShow {
            id: "S".to_string(),
            display_title: "Show".to_string(),
            primary_image: None,
            backdrop_image: None,
            seasons: group_into_seasons(vec![
                episode(Some("E1"), Some(1), Some(1), "One"),
                episode(Some("E2"), Some(2), Some(1), "Two"),
            ]),
        };
        let movie = DownloadedMovie {
            id: "M".to_string(),
            item: BaseItem::default(),
            primary_image: None,
            backdrop_image: None,
            versions: Vec::new(),
        };
        let mut items = DownloadedItems {
            shows: vec![show],
            movies: vec![movie],
        };
        assert_eq!(items.item_count(), 3);

        assert!(items.remove("E2"));
        assert_eq!(items.show("S").unwrap().seasons.len(), 1);

        assert!(!items.remove("unknown"));

        assert!(items.remove("M"));
        assert!(items.movies.is_empty());

        assert!(items.remove("E1"));
        assert!(items.is_empty());
    }
}

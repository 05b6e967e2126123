//! Fallback matching rules
//!
//! Every decision the reconciliation engine makes from incomplete metadata is
//! expressed here as an ordered list of small pure rules. A chain is tried in
//! priority order and the first rule that yields a result wins, so each policy
//! can be read top to bottom and tested without touching the filesystem.

use crate::file_resolver::{is_hidden, is_metadata_file};
use crate::metadata::VersionInfo;
use std::path::{Path, PathBuf};

/// Minimum length an inferred identifier must exceed to be trusted
const MIN_INFERRED_ID_LEN: usize = 10;

/// Prefix of the generic media file name used by older downloads
pub(crate) const GENERIC_MEDIA_PREFIX: &str = "Media.";

/// Name of the image folder inside item, season and series folders
pub(crate) const IMAGES_FOLDER: &str = "Images";

/// A rule deciding whether a file name satisfies a query
type NameRule<Q> = fn(&Q, &str) -> bool;

/// Returns the first candidate accepted by the highest-priority rule
///
/// Metadata and hidden files are never candidates.
fn first_by_rules<'n, Q>(
    names: &'n [String],
    query: &Q,
    rules: &[NameRule<Q>],
) -> Option<&'n str> {
    rules.iter().find_map(|rule| {
        names
            .iter()
            .map(String::as_str)
            .filter(|name| !is_metadata_file(name) && !is_hidden(name))
            .find(|name| rule(query, name))
    })
}

// ---------------------------------------------------------------------------
// Version matching
// ---------------------------------------------------------------------------

/// A rule deciding whether a version row belongs to an episode key
type VersionRule = fn(&VersionInfo, &str) -> bool;

fn version_episode_id_equals(version: &VersionInfo, key: &str) -> bool {
    version.episode_id.as_deref() == Some(key)
}

fn version_id_equals(version: &VersionInfo, key: &str) -> bool {
    version.version_id == key
}

fn version_media_source_id_equals(version: &VersionInfo, key: &str) -> bool {
    version.media_source_id.as_deref() == Some(key)
}

/// Version matching tiers, each tried across all versions before the next
const VERSION_RULES: &[VersionRule] = &[
    version_episode_id_equals,
    version_id_equals,
    version_media_source_id_equals,
];

/// Finds the index of the version row that belongs to `episode_key`
pub(crate) fn match_version(versions: &[VersionInfo], episode_key: &str) -> Option<usize> {
    VERSION_RULES.iter().find_map(|rule| {
        versions
            .iter()
            .position(|version| rule(version, episode_key))
    })
}

// ---------------------------------------------------------------------------
// Episode identifier inference from file names
// ---------------------------------------------------------------------------

fn name_contains_media_source_id(version: &VersionInfo, name: &str) -> bool {
    version
        .media_source_id
        .as_deref()
        .is_some_and(|msid| name.contains(msid))
}

fn name_contains_version_id(version: &VersionInfo, name: &str) -> bool {
    name.contains(version.version_id.as_str())
}

fn name_has_separator(_: &VersionInfo, name: &str) -> bool {
    name.contains('-')
}

const INFERENCE_RULES: &[NameRule<VersionInfo>] = &[
    name_contains_media_source_id,
    name_contains_version_id,
    name_has_separator,
];

/// Infers an episode identifier from names like `<episodeId>-<versionId>.mp4`
///
/// Only the first qualifying file is considered. Its prefix before the first
/// `-` is returned when it is long enough to look like a server identifier.
pub(crate) fn infer_episode_id(file_names: &[String], version: &VersionInfo) -> Option<String> {
    let candidate = first_by_rules(file_names, version, INFERENCE_RULES)?;
    let (prefix, _) = candidate.split_once('-')?;

    (prefix.len() > MIN_INFERRED_ID_LEN).then(|| prefix.to_string())
}

// ---------------------------------------------------------------------------
// Legacy episode identity
// ---------------------------------------------------------------------------

/// What is known about a version row when resolving its episode identity
#[derive(Debug)]
pub(crate) struct IdentityClues<'a> {
    pub version: &'a VersionInfo,
    /// Identifier inferred from the season folder's file names
    pub inferred_id: Option<String>,
}

type IdentityRule = for<'c> fn(&'c IdentityClues<'_>) -> Option<&'c str>;

fn explicit_episode_id<'c>(clues: &'c IdentityClues<'_>) -> Option<&'c str> {
    clues.version.episode_id.as_deref()
}

fn inferred_episode_id<'c>(clues: &'c IdentityClues<'_>) -> Option<&'c str> {
    clues.inferred_id.as_deref()
}

fn media_source_id_as_identity<'c>(clues: &'c IdentityClues<'_>) -> Option<&'c str> {
    clues.version.media_source_id.as_deref()
}

fn version_id_as_identity<'c>(clues: &'c IdentityClues<'_>) -> Option<&'c str> {
    Some(clues.version.version_id.as_str())
}

const IDENTITY_RULES: &[IdentityRule] = &[
    explicit_episode_id,
    inferred_episode_id,
    media_source_id_as_identity,
    version_id_as_identity,
];

/// Lists the identifiers a version row may belong to, most trusted first
pub(crate) fn identity_candidates<'c>(clues: &'c IdentityClues<'_>) -> Vec<&'c str> {
    let mut candidates: Vec<&str> = Vec::with_capacity(IDENTITY_RULES.len());
    for candidate in IDENTITY_RULES.iter().filter_map(|rule| rule(clues)) {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

// ---------------------------------------------------------------------------
// Media file resolution
// ---------------------------------------------------------------------------

/// Identifiers a media file name may carry
#[derive(Debug, Clone, Copy)]
pub(crate) struct MediaQuery<'a> {
    pub media_source_id: Option<&'a str>,
    pub item_id: Option<&'a str>,
}

fn media_name_contains_media_source_id(query: &MediaQuery<'_>, name: &str) -> bool {
    query.media_source_id.is_some_and(|msid| name.contains(msid))
}

fn media_name_contains_item_id(query: &MediaQuery<'_>, name: &str) -> bool {
    query.item_id.is_some_and(|id| name.contains(id))
}

fn media_name_is_generic(_: &MediaQuery<'_>, name: &str) -> bool {
    name.starts_with(GENERIC_MEDIA_PREFIX)
}

/// Picks the media file for a version out of a folder's file names
pub(crate) fn resolve_media_file<'n>(
    file_names: &'n [String],
    query: &MediaQuery<'_>,
) -> Option<&'n str> {
    let rules: [NameRule<MediaQuery<'_>>; 3] = [
        media_name_contains_media_source_id as NameRule<MediaQuery<'_>>,
        media_name_contains_item_id as NameRule<MediaQuery<'_>>,
        media_name_is_generic as NameRule<MediaQuery<'_>>,
    ];
    first_by_rules(file_names, query, &rules)
}

// ---------------------------------------------------------------------------
// Image lookup
// ---------------------------------------------------------------------------

/// Artwork kinds stored with downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageKind {
    Primary,
    Backdrop,
}

impl ImageKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ImageKind::Primary => "Primary",
            ImageKind::Backdrop => "Backdrop",
        }
    }
}

/// One place to look for an image: a folder and a file name prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageStep {
    pub folder: PathBuf,
    pub prefix: String,
}

impl ImageStep {
    fn new(folder: &Path, prefix: String) -> Self {
        Self {
            folder: folder.join(IMAGES_FOLDER),
            prefix,
        }
    }
}

/// Where an episode's artwork may live
#[derive(Debug, Clone, Copy)]
pub(crate) struct EpisodeImageQuery<'a> {
    pub season_dir: &'a Path,
    pub series_dir: &'a Path,
    pub series_id: &'a str,
    pub episode_id: Option<&'a str>,
    pub season_id: Option<&'a str>,
}

/// Episode image lookup order: episode, then season, then series artwork
pub(crate) fn episode_image_steps(query: &EpisodeImageQuery<'_>, kind: ImageKind) -> Vec<ImageStep> {
    let name = kind.name();
    let mut steps = Vec::with_capacity(3);

    if let Some(episode_id) = query.episode_id {
        steps.push(ImageStep::new(query.season_dir, format!("Episode-{episode_id}-{name}")));
    }
    if let Some(season_id) = query.season_id {
        steps.push(ImageStep::new(query.season_dir, format!("Season-{season_id}-{name}")));
    }
    steps.push(ImageStep::new(
        query.series_dir,
        format!("Series-{}-{name}", query.series_id),
    ));

    steps
}

/// Image lookup order for movies and other single-item downloads
pub(crate) fn item_image_steps(item_dir: &Path, item_id: &str, kind: ImageKind) -> Vec<ImageStep> {
    let name = kind.name();
    vec![
        ImageStep::new(item_dir, name.to_string()),
        ImageStep::new(item_dir, format!("Series-{item_id}-{name}")),
        ImageStep::new(item_dir, format!("Episode-{item_id}-{name}")),
    ]
}

/// Picks the first name in a listing with the step's prefix
pub(crate) fn find_with_prefix<'n>(file_names: &'n [String], prefix: &str) -> Option<&'n str> {
    file_names
        .iter()
        .map(String::as_str)
        .find(|name| name.starts_with(prefix))
}

//! Builders for on-disk download fixtures used across test modules

use crate::metadata::METADATA_FILE_NAME;
use crate::reconcile::SEASON_FOLDER_PREFIX;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary downloads root
pub(crate) struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates `<root>/<id>` and returns it
    pub(crate) fn item_dir(&self, id: &str) -> PathBuf {
        let path = self.root().join(id);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates `<root>/<series>/Season-<number>` and returns it
    pub(crate) fn season(&self, series: &str, number: i32) -> PathBuf {
        let path = self
            .root()
            .join(series)
            .join(format!("{SEASON_FOLDER_PREFIX}{number:02}"));
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates the `Images` folder below `dir` and returns it
    pub(crate) fn images(&self, dir: &Path) -> PathBuf {
        let path = dir.join("Images");
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub(crate) fn write_metadata(&self, dir: &Path, contents: Value) {
        self.write_raw(dir, METADATA_FILE_NAME, &contents.to_string());
    }

    pub(crate) fn write_raw(&self, dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    /// Creates an empty file
    pub(crate) fn touch(&self, dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }
}

pub(crate) fn episode_item(id: &str, name: &str, season: i32, number: i32) -> Value {
    json!({
        "Id": id,
        "Name": name,
        "Type": "Episode",
        "ParentIndexNumber": season,
        "IndexNumber": number
    })
}

pub(crate) fn movie_item(id: &str, name: &str) -> Value {
    json!({
        "Id": id,
        "Name": name,
        "Type": "Movie",
        "ProductionYear": 2019
    })
}

pub(crate) fn version_for_episode(
    version_id: &str,
    episode_id: &str,
    media_source_id: Option<&str>,
) -> Value {
    let mut version = json!({
        "versionId": version_id,
        "container": "mp4",
        "isStatic": true,
        "episodeId": episode_id,
        "downloadDate": "2024-03-01T12:00:00Z",
        "taskId": format!("task-{version_id}")
    });
    if let Some(msid) = media_source_id {
        version["mediaSourceId"] = json!(msid);
    }
    version
}

/// A version whose media source identifier equals its version identifier
pub(crate) fn version_for_movie(version_id: &str) -> Value {
    json!({
        "versionId": version_id,
        "container": "mp4",
        "isStatic": true,
        "mediaSourceId": version_id,
        "downloadDate": "2024-03-01T12:00:00Z"
    })
}

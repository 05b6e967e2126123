//! Item descriptor types embedded in sidecar metadata.
//!
//! These mirror the subset of the media server's item record that is needed
//! to render downloads without network access. The server encodes them with
//! PascalCase keys; unknown keys are ignored.

use serde::{Deserialize, Serialize};

/// Ticks per minute in the server's 100ns tick unit.
const TICKS_PER_MINUTE: i64 = 600_000_000;

/// Kind of an item descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Episode,
    Series,
    Season,
    /// Any other server item type (audio, video, folders...)
    #[serde(other)]
    Other,
}

/// A media server item record as stored next to downloaded media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    /// Server-side identifier of the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Item type
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_name: Option<String>,
    /// Season number for episodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_index_number: Option<i32>,
    /// Episode number within the season
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time_ticks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,
}

impl BaseItem {
    /// Returns the name to show for this item, or "Unknown" if it has none.
    pub fn display_title(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Returns true if the descriptor is typed as an episode
    pub fn is_episode(&self) -> bool {
        self.kind == Some(ItemKind::Episode)
    }

    /// Runtime in whole minutes, if the runtime is known
    pub fn runtime_minutes(&self) -> Option<i64> {
        self.run_time_ticks.map(|ticks| ticks / TICKS_PER_MINUTE)
    }
}

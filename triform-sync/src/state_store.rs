//! Sync State store: `<root>/.triform/state.json`.
//!
//! Records, per node-key path, which folder holds which remote component and
//! the checksum last pulled or pushed. Pull replaces the whole document; push
//! only updates checksums and adds entries for created components.
//!
//! Older project folders wrote snake_case field names and sometimes a flat map
//! without the `components` wrapper; both still load.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use triform_core::{layout, ComponentKind};

use crate::error::{io_err, SyncError};

/// One tracked component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// Root-relative folder path with `/` separators.
    #[serde(alias = "dir")]
    pub directory: String,
    #[serde(alias = "type")]
    pub kind: ComponentKind,
    #[serde(alias = "component_id")]
    pub remote_id: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
}

/// On-disk Sync State document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub components: IndexMap<String, StateEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SyncStateCompat {
    Structured(SyncStateStructuredCompat),
    Legacy(IndexMap<String, StateEntry>),
}

#[derive(Debug, Deserialize)]
struct SyncStateStructuredCompat {
    components: IndexMap<String, StateEntry>,
    #[serde(
        default,
        alias = "lastSyncTimestamp",
        alias = "last_sync",
        deserialize_with = "lenient_timestamp"
    )]
    last_sync_timestamp: Option<DateTime<Utc>>,
}

/// RFC 3339, or a naive ISO timestamp taken as UTC; anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

impl SyncState {
    /// Entry whose folder is `directory`.
    pub fn find_by_directory(&self, directory: &str) -> Option<(&String, &StateEntry)> {
        self.components
            .iter()
            .find(|(_, entry)| entry.directory == directory)
    }

    /// Key of the entry tracking `remote_id` at exactly `directory`.
    pub fn key_for(&self, remote_id: &str, directory: &str) -> Option<String> {
        self.components
            .iter()
            .find(|(_, e)| e.remote_id == remote_id && e.directory == directory)
            .map(|(key, _)| key.clone())
    }

    /// Every entry tracking `remote_id`, wherever it is placed.
    pub fn entries_for<'a>(
        &'a self,
        remote_id: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a StateEntry)> + 'a {
        self.components
            .iter()
            .filter(move |(_, e)| e.remote_id == remote_id)
    }

    pub fn is_tracked_directory(&self, directory: &str) -> bool {
        self.find_by_directory(directory).is_some()
    }
}

/// Load the Sync State of the project at `root`.
///
/// Returns an empty state if the file does not exist. A file that exists but
/// cannot be decoded is [`SyncError::InvalidLocalContent`].
pub fn load_at(root: &Path) -> Result<SyncState, SyncError> {
    let path = layout::state_path(root);
    if !path.exists() {
        return Ok(SyncState::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let compat = serde_json::from_str::<SyncStateCompat>(&contents).map_err(|e| {
        SyncError::InvalidLocalContent {
            path: path.clone(),
            message: e.to_string(),
        }
    })?;
    Ok(match compat {
        SyncStateCompat::Structured(state) => SyncState {
            components: state.components,
            last_sync_timestamp: state.last_sync_timestamp,
        },
        SyncStateCompat::Legacy(components) => SyncState {
            components,
            last_sync_timestamp: None,
        },
    })
}

/// Save the Sync State atomically (`state.json.tmp` + rename).
pub fn save_at(root: &Path, state: &SyncState) -> Result<(), SyncError> {
    let path = layout::state_path(root);
    let dir = layout::meta_dir(root);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

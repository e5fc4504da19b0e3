//! Local change report for `triform diff`.
//!
//! Compares the tree on disk with the Sync State without contacting the
//! remote service. No files are written.

use std::path::Path;

use serde::Serialize;

use triform_core::{identity, ComponentKind};
use triform_detector::{discover_components, read_sidecar, resolve_kind, FolderListing};

use crate::error::SyncError;
use crate::local::local_checksum;
use crate::state_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalStatus {
    Unchanged,
    /// Checksum differs from the last pull or push.
    Modified,
    /// Folder missing, or no longer structurally the recorded kind.
    Deleted,
    /// Component folder not tracked by the Sync State.
    New,
}

impl LocalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LocalStatus::Unchanged => "unchanged",
            LocalStatus::Modified => "modified",
            LocalStatus::Deleted => "deleted",
            LocalStatus::New => "new",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalChange {
    /// Sync State key; `None` for new folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub directory: String,
    pub kind: ComponentKind,
    pub status: LocalStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub changes: Vec<LocalChange>,
}

impl DiffReport {
    pub fn count(&self, status: LocalStatus) -> usize {
        self.changes.iter().filter(|c| c.status == status).count()
    }

    /// Entries other than [`LocalStatus::Unchanged`].
    pub fn pending(&self) -> impl Iterator<Item = &LocalChange> {
        self.changes
            .iter()
            .filter(|c| c.status != LocalStatus::Unchanged)
    }

    pub fn is_clean(&self) -> bool {
        self.pending().next().is_none()
    }
}

/// Classify every tracked and every discovered component of the project at
/// `root`.
pub fn diff_project(root: &Path) -> Result<DiffReport, SyncError> {
    identity::load_at(root)?;
    let state = state_store::load_at(root)?;
    let mut report = DiffReport::default();

    for (key, entry) in &state.components {
        let dir = root.join(&entry.directory);
        let status = if !dir.is_dir() {
            LocalStatus::Deleted
        } else {
            let listing = FolderListing::read(&dir)?;
            let sidecar = read_sidecar(&dir).ok().flatten();
            if resolve_kind(&listing, sidecar.as_ref()) != Some(entry.kind) {
                LocalStatus::Deleted
            } else {
                match local_checksum(&dir, entry.kind, sidecar.as_ref()) {
                    Ok(sum) if sum == entry.checksum => LocalStatus::Unchanged,
                    Ok(_) | Err(SyncError::InvalidLocalContent { .. }) => LocalStatus::Modified,
                    Err(err) => return Err(err),
                }
            }
        };
        report.changes.push(LocalChange {
            key: Some(key.clone()),
            directory: entry.directory.clone(),
            kind: entry.kind,
            status,
        });
    }

    for found in discover_components(root)? {
        if state.is_tracked_directory(&found.relative) {
            continue;
        }
        report.changes.push(LocalChange {
            key: None,
            directory: found.relative,
            kind: found.kind,
            status: LocalStatus::New,
        });
    }

    Ok(report)
}

//! Push: local directory tree → remote mutations + updated Sync State.
//!
//! Each discovered component folder ends the run in exactly one bucket of
//! [`PushReport`]: unchanged, updated, created, pending-new, stale or
//! errored. A failure in one folder is recorded and the walk continues.

use std::path::Path;

use chrono::Utc;

use triform_api::{ProjectMetaUpdate, RemoteApi, Requirements};
use triform_core::{identity, layout, ComponentSidecar, Payload, ProjectIdentity};
use triform_detector::{discover_components, DiscoveredComponent};

use crate::error::{PushFailure, SyncError};
use crate::local::{read_component, read_json_lenient, split_requirements, LocalComponent};
use crate::state_store::{self, StateEntry, SyncState};
use crate::writer::write_json_if_changed;

/// Label for the project metadata update in [`PushReport::project`].
pub const PROJECT_METADATA: &str = "project metadata";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Update every known component even when its checksum is unchanged.
    pub force: bool,
    /// Create remote components for folders without an identity.
    pub create: bool,
}

/// Outcome of a push. Folder entries are root-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Project-level items sent (`project metadata`, `requirements.json`).
    pub project: Vec<String>,
    pub updated: Vec<String>,
    pub created: Vec<String>,
    pub unchanged: Vec<String>,
    /// Folders without a remote identity, left alone because creation was
    /// not requested.
    pub pending_new: Vec<String>,
    /// Folders whose sidecar names a component the Sync State tracks at
    /// another directory that still exists, typically left behind when a
    /// remote rename moved the component. Never pushed.
    pub stale: Vec<String>,
    pub errors: Vec<PushFailure>,
}

impl PushReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of components updated or created.
    pub fn changed(&self) -> usize {
        self.updated.len() + self.created.len()
    }
}

/// Push the project rooted at `root`.
///
/// Fails only when `root` is not a project or its Sync State is unreadable;
/// everything else lands in the report.
pub fn push_project(
    api: &dyn RemoteApi,
    root: &Path,
    options: PushOptions,
) -> Result<PushReport, SyncError> {
    let identity = identity::load_at(root)?;
    let mut state = state_store::load_at(root)?;
    let mut report = PushReport::default();

    tracing::info!("pushing changes for project '{}'", identity.project_name);
    push_project_level(api, root, &identity, &mut report);

    let discovered = discover_components(root)?;
    tracing::info!("found {} components", discovered.len());
    for found in &discovered {
        push_folder(api, root, found, options, &mut state, &mut report);
    }

    state.last_sync_timestamp = Some(Utc::now());
    state_store::save_at(root, &state)?;

    tracing::info!(
        "push complete: {} updated, {} created, {} unchanged, {} new, {} stale, {} errors",
        report.updated.len(),
        report.created.len(),
        report.unchanged.len(),
        report.pending_new.len(),
        report.stale.len(),
        report.errors.len()
    );
    Ok(report)
}

fn push_project_level(
    api: &dyn RemoteApi,
    root: &Path,
    identity: &ProjectIdentity,
    report: &mut PushReport,
) {
    let (description, requirements) = match read_json_lenient(&root.join(layout::REQUIREMENTS))
    {
        Ok(value) => split_requirements(value),
        Err(err) => {
            tracing::warn!("error reading project requirements: {err}");
            report
                .errors
                .push(PushFailure::new(layout::REQUIREMENTS, err));
            (String::new(), Requirements::new())
        }
    };

    let meta = ProjectMetaUpdate {
        name: identity.project_name.clone(),
        intention: (!description.is_empty()).then_some(description),
    };
    match api.update_project(&identity.project_id, &meta, None) {
        Ok(()) => {
            tracing::info!("updated project metadata");
            report.project.push(PROJECT_METADATA.to_string());
        }
        Err(err) => {
            tracing::warn!("error updating project metadata: {err}");
            report.errors.push(PushFailure::new(PROJECT_METADATA, err));
        }
    }

    if !requirements.is_empty() {
        match api.update_project_requirements(&identity.project_id, &requirements) {
            Ok(()) => {
                tracing::info!("updated project requirements");
                report.project.push(layout::REQUIREMENTS.to_string());
            }
            Err(err) => {
                tracing::warn!("error updating project requirements: {err}");
                report
                    .errors
                    .push(PushFailure::new(layout::REQUIREMENTS, err));
            }
        }
    }
}

/// Remote id of a folder: the sidecar id, else the Sync State entry tracking
/// the folder's directory.
fn resolve_identity(found: &DiscoveredComponent, state: &SyncState) -> Option<String> {
    found
        .sidecar
        .as_ref()
        .map(|s| s.id.clone())
        .filter(|id| !id.is_empty())
        .or_else(|| {
            state
                .find_by_directory(&found.relative)
                .map(|(_, entry)| entry.remote_id.clone())
                .filter(|id| !id.is_empty())
        })
}

fn push_folder(
    api: &dyn RemoteApi,
    root: &Path,
    found: &DiscoveredComponent,
    options: PushOptions,
    state: &mut SyncState,
    report: &mut PushReport,
) {
    let rel = found.relative.clone();
    let local = match read_component(&found.dir, found.kind, found.sidecar.as_ref()) {
        Ok(local) => local,
        Err(err) => {
            tracing::warn!("error reading {rel}: {err}");
            report.errors.push(PushFailure::new(rel, err));
            return;
        }
    };

    let id = match resolve_identity(found, state) {
        Some(id) => id,
        None if options.create => {
            create_folder(api, found, &local, state, report);
            return;
        }
        None => {
            tracing::info!("new component (not pushed): {rel}");
            report.pending_new.push(rel);
            return;
        }
    };

    let key = match state.key_for(&id, &rel) {
        Some(key) => Some(key),
        None => match placement(root, state, &id) {
            Placement::Untracked => None,
            Placement::Moved(key) => {
                if let Some(entry) = state.components.get_mut(&key) {
                    entry.directory = rel.clone();
                }
                Some(key)
            }
            Placement::Elsewhere(current) => {
                tracing::warn!("stale: {rel} ({id} is tracked at {current}); not pushed");
                report.stale.push(rel);
                return;
            }
        },
    };
    let stored = key
        .as_ref()
        .and_then(|k| state.components.get(k))
        .map(|entry| entry.checksum.as_str());

    if !options.force && stored == Some(local.checksum.as_str()) {
        tracing::debug!("unchanged: {rel}");
        report.unchanged.push(rel.clone());
    } else {
        match api.update_component(&id, &local.meta, &local.wire_spec()) {
            Ok(()) => {
                tracing::info!("updated: {rel}");
                record_checksum(state, key, found, &id, &local);
                report.updated.push(rel.clone());
            }
            Err(err) => {
                tracing::warn!("error updating {rel}: {err}");
                report.errors.push(PushFailure::new(rel.clone(), err));
            }
        }
    }

    push_requirements(api, &id, &local.requirements, &rel);
}

/// Where the Sync State places a component it does not track at the
/// folder being pushed.
enum Placement {
    /// No entry for the id at all.
    Untracked,
    /// Tracked only at directories that no longer exist; the folder was
    /// moved locally and takes over this entry.
    Moved(String),
    /// Tracked at another directory that is still on disk.
    Elsewhere(String),
}

fn placement(root: &Path, state: &SyncState, id: &str) -> Placement {
    let mut moved = None;
    for (key, entry) in state.entries_for(id) {
        if root.join(&entry.directory).is_dir() {
            return Placement::Elsewhere(entry.directory.clone());
        }
        moved.get_or_insert_with(|| key.clone());
    }
    moved.map_or(Placement::Untracked, Placement::Moved)
}

fn record_checksum(
    state: &mut SyncState,
    key: Option<String>,
    found: &DiscoveredComponent,
    id: &str,
    local: &LocalComponent,
) {
    if let Some(entry) = key.as_ref().and_then(|k| state.components.get_mut(k)) {
        entry.checksum = local.checksum.clone();
        return;
    }
    let key = found
        .sidecar
        .as_ref()
        .and_then(|s| s.node_key.clone())
        .unwrap_or_else(|| found.relative.clone());
    state.components.insert(key, state_entry(found, id, local));
}

fn state_entry(found: &DiscoveredComponent, id: &str, local: &LocalComponent) -> StateEntry {
    StateEntry {
        directory: found.relative.clone(),
        kind: local.kind(),
        remote_id: id.to_string(),
        checksum: local.checksum.clone(),
        runtime: match &local.payload {
            Payload::Leaf(leaf) => Some(leaf.runtime.clone()),
            _ => None,
        },
        starred: Some(local.meta.starred),
    }
}

fn create_folder(
    api: &dyn RemoteApi,
    found: &DiscoveredComponent,
    local: &LocalComponent,
    state: &mut SyncState,
    report: &mut PushReport,
) {
    let rel = found.relative.clone();
    let id = match api.create_component(local.kind(), &local.meta, &local.wire_spec()) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!("error creating {rel}: {err}");
            report.errors.push(PushFailure::new(rel, err));
            return;
        }
    };
    tracing::info!("created: {rel} ({id})");

    let entry = state_entry(found, &id, local);
    let sidecar = ComponentSidecar {
        id: id.clone(),
        kind: Some(local.kind()),
        node_key: None,
        name: Some(local.meta.name.clone()),
        runtime: entry.runtime.clone(),
        starred: Some(local.meta.starred),
    };
    // Tracked even without a sidecar so the next push does not create it again.
    state.components.insert(rel.clone(), entry);
    match write_json_if_changed(&found.dir.join(layout::SIDECAR), &sidecar) {
        Ok(_) => report.created.push(rel.clone()),
        Err(err) => {
            tracing::warn!("created {rel} as {id} but could not write its sidecar: {err}");
            report.errors.push(PushFailure::new(
                rel.clone(),
                format!("created as {id} but could not write identity sidecar: {err}"),
            ));
        }
    }

    push_requirements(api, &id, &local.requirements, &rel);
}

/// Best-effort requirements side call; failures are only logged.
fn push_requirements(api: &dyn RemoteApi, id: &str, requirements: &Requirements, rel: &str) {
    if requirements.is_empty() {
        return;
    }
    if let Err(err) = api.update_component_requirements(id, requirements) {
        tracing::warn!("could not update requirements for {rel}: {err}");
    }
}

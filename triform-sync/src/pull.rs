//! Pull: remote project → local directory tree + Sync State.
//!
//! ## Steps
//!
//! 1. Fetch the project (`NotFound` if absent).
//! 2. Resolve the owning organization, falling back to `"default"`.
//! 3. Pick the target root (`<workspace>/<org>/<project>` unless given).
//! 4. Write the environment file, readme, requirements and triggers.
//! 5. Materialize every top-level node recursively.
//! 6. Distribute modifier bindings by longest matching node path.
//! 7. Save the project identity and a fresh Sync State.
//!
//! All writes are hash-gated, so re-pulling an unchanged project leaves
//! modification times alone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{json, Value};

use triform_api::{RemoteApi, Requirements, FULL_DEPTH};
use triform_core::types::is_truthy;
use triform_core::{
    identity, layout, ChildRef, Component, ComponentKind, ComponentSidecar, Payload, Project,
    ProjectIdentity,
};
use triform_renderer::Renderer;

use crate::checksum::{checksum_json, checksum_text};
use crate::error::{io_err, SyncError};
use crate::naming::{sanitize_filename, sanitize_name, unique_dir_name};
use crate::state_store::{self, StateEntry, SyncState};
use crate::writer::{write_if_changed, write_json_if_changed, WriteResult};

/// Organization label used when memberships cannot be resolved.
pub const DEFAULT_ORGANIZATION: &str = "default";

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Explicit target root. When `None` the root is derived under
    /// `workspace_root`.
    pub target_dir: Option<PathBuf>,
    pub workspace_root: PathBuf,
    /// Directory of user template overrides.
    pub templates_dir: Option<PathBuf>,
}

impl PullOptions {
    /// Pull straight into `dir`.
    pub fn into_dir(dir: impl Into<PathBuf>) -> Self {
        PullOptions {
            target_dir: Some(dir.into()),
            ..PullOptions::default()
        }
    }
}

/// Outcome of a pull.
#[derive(Debug, Clone)]
pub struct PullReport {
    pub root: PathBuf,
    pub project_name: String,
    pub organization_name: String,
    /// Number of top-level nodes materialized.
    pub top_level: usize,
    /// Top-level node keys that could not be fetched.
    pub skipped: Vec<String>,
    pub state: SyncState,
    pub files_written: usize,
    pub files_unchanged: usize,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Pull `project_id` into a local directory tree.
pub fn pull_project(
    api: &dyn RemoteApi,
    project_id: &str,
    options: &PullOptions,
) -> Result<PullReport, SyncError> {
    let renderer = match &options.templates_dir {
        Some(dir) => Renderer::with_overrides(dir)?,
        None => Renderer::new()?,
    };

    tracing::info!("fetching project {project_id}");
    let project = api
        .get_project(project_id)?
        .ok_or_else(|| SyncError::NotFound {
            id: project_id.to_string(),
        })?;
    let project_name = project.meta.name.clone();

    let (organization_id, organization_name) =
        resolve_organization(api, project.owned_by.as_deref());

    let root = match &options.target_dir {
        Some(dir) => dir.clone(),
        None => options
            .workspace_root
            .join(sanitize_name(&organization_name))
            .join(sanitize_name(&project_name)),
    };
    std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    tracing::info!(
        "pulling project '{project_name}' from org '{organization_name}' to {}",
        root.display()
    );

    let mut m = Materializer::new(api, &renderer, &root);
    m.write_project_files(&project)?;

    let mut reserved: HashSet<String> = layout::SKIPPED_DIRS
        .iter()
        .chain(std::iter::once(&layout::TRIGGERS_DIR))
        .map(|s| s.to_string())
        .collect();
    let mut top_level = 0;
    let mut skipped = Vec::new();
    for (node_key, node) in &project.spec.nodes {
        let Some(component_id) = node.component_id.as_deref() else {
            tracing::debug!("node {node_key} has no component id; skipped");
            continue;
        };
        tracing::info!("fetching component {component_id}");
        match api.get_component(component_id, FULL_DEPTH) {
            Ok(Some(component)) => {
                m.materialize(&component, &root, &mut reserved, node_key, Some(component_id))?;
                top_level += 1;
            }
            Ok(None) => {
                tracing::warn!("component {component_id} for node {node_key} not found");
                skipped.push(node_key.clone());
            }
            Err(err) => {
                tracing::warn!("could not fetch component {component_id}: {err}");
                skipped.push(node_key.clone());
            }
        }
    }

    m.distribute_modifiers(&project.spec.modifiers)?;

    identity::save_at(
        &root,
        &ProjectIdentity {
            project_id: project_id.to_string(),
            project_name: project_name.clone(),
            organization_id,
            organization_name: Some(organization_name.clone()),
        },
    )?;
    let (files_written, files_unchanged) = (m.written, m.unchanged);
    let state = SyncState {
        components: m.state,
        last_sync_timestamp: Some(Utc::now()),
    };
    state_store::save_at(&root, &state)?;

    tracing::info!(
        "project pulled to {} ({top_level} top-level components)",
        root.display()
    );
    Ok(PullReport {
        root,
        project_name,
        organization_name,
        top_level,
        skipped,
        state,
        files_written,
        files_unchanged,
    })
}

/// Owning organization as `(id, name)`: the membership matching `owned_by`,
/// else the first membership, else `(None, "default")`. Never fails.
pub fn resolve_organization(
    api: &dyn RemoteApi,
    owned_by: Option<&str>,
) -> (Option<String>, String) {
    let memberships = match api.list_memberships() {
        Ok(memberships) => memberships,
        Err(err) => {
            tracing::warn!("could not resolve organization: {err}");
            return (None, DEFAULT_ORGANIZATION.to_string());
        }
    };
    let chosen = memberships
        .iter()
        .find(|m| owned_by.is_some_and(|owner| m.organization.id == owner))
        .or_else(|| memberships.first());
    match chosen {
        Some(m) => {
            let name = if m.organization.name.is_empty() {
                DEFAULT_ORGANIZATION.to_string()
            } else {
                m.organization.name.clone()
            };
            (Some(m.organization.id.clone()), name)
        }
        None => (None, DEFAULT_ORGANIZATION.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Shared document builders
// ---------------------------------------------------------------------------

/// `requirements.json` document: `description` first when non-empty, then the
/// known sections that are present and non-empty.
pub fn build_requirements(requirements: &Requirements, description: &str) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    if !description.is_empty() {
        out.insert(
            layout::DESCRIPTION_KEY.to_string(),
            Value::String(description.to_string()),
        );
    }
    for key in layout::REQUIREMENT_KEYS {
        if let Some(value) = requirements.get(*key).filter(|v| is_truthy(v)) {
            out.insert(key.to_string(), value.clone());
        }
    }
    out
}

/// Children definition written to `nodes.json`, embedded payloads stripped.
///
/// Flow entries carry `position` and `loop`, agent entries carry `order`.
pub fn children_definition(
    kind: ComponentKind,
    nodes: &IndexMap<String, ChildRef>,
) -> IndexMap<String, Value> {
    nodes
        .iter()
        .map(|(key, child)| {
            let inputs = if child.inputs.is_null() {
                json!({})
            } else {
                child.inputs.clone()
            };
            let entry = match kind {
                ComponentKind::Agent => json!({
                    "component_id": child.component_id,
                    "inputs": inputs,
                    "order": child.order.clone().unwrap_or_else(|| json!(0)),
                }),
                _ => json!({
                    "component_id": child.component_id,
                    "inputs": inputs,
                    "position": child.position.clone().unwrap_or_else(|| json!({ "x": 0, "y": 0 })),
                    "loop": child.loop_config.clone().unwrap_or_else(|| json!({ "enabled": false })),
                }),
            };
            (key.clone(), entry)
        })
        .collect()
}

/// Folder for a modifier path: the exact node path, else its longest ancestor
/// with a known folder.
pub fn resolve_modifier_folder<'a>(
    node_folders: &'a IndexMap<String, PathBuf>,
    path: &str,
) -> Option<&'a PathBuf> {
    let parts: Vec<&str> = path.split('/').collect();
    (1..=parts.len())
        .rev()
        .find_map(|n| node_folders.get(&parts[..n].join("/")))
}

fn schema_document(inputs: &Value, outputs: &Value) -> Option<IndexMap<&'static str, Value>> {
    let mut doc = IndexMap::new();
    if is_truthy(inputs) {
        doc.insert("inputs", inputs.clone());
    }
    if is_truthy(outputs) {
        doc.insert("outputs", outputs.clone());
    }
    (!doc.is_empty()).then_some(doc)
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

/// Per-pull state threaded through the recursive walk.
struct Materializer<'a> {
    api: &'a dyn RemoteApi,
    renderer: &'a Renderer,
    root: &'a Path,
    /// Full node path → folder, used for modifier distribution.
    node_folders: IndexMap<String, PathBuf>,
    state: IndexMap<String, StateEntry>,
    written: usize,
    unchanged: usize,
}

impl<'a> Materializer<'a> {
    fn new(api: &'a dyn RemoteApi, renderer: &'a Renderer, root: &'a Path) -> Self {
        Materializer {
            api,
            renderer,
            root,
            node_folders: IndexMap::new(),
            state: IndexMap::new(),
            written: 0,
            unchanged: 0,
        }
    }

    fn tally(&mut self, result: WriteResult) {
        if result.is_written() {
            self.written += 1;
        } else {
            self.unchanged += 1;
        }
    }

    fn write_text(&mut self, path: &Path, content: &str) -> Result<(), SyncError> {
        let result = write_if_changed(path, content)?;
        self.tally(result);
        Ok(())
    }

    fn write_json<T: serde::Serialize + ?Sized>(
        &mut self,
        path: &Path,
        value: &T,
    ) -> Result<(), SyncError> {
        let result = write_json_if_changed(path, value)?;
        self.tally(result);
        Ok(())
    }

    fn readme_or_default(&self, readme: &str, name: &str) -> Result<String, SyncError> {
        if readme.is_empty() {
            Ok(self.renderer.render_readme(name)?)
        } else {
            Ok(readme.to_string())
        }
    }

    // -- project level -----------------------------------------------------

    fn write_project_files(&mut self, project: &Project) -> Result<(), SyncError> {
        let root = self.root;
        let name = &project.meta.name;

        let env = self.renderer.render_env_file(&project.spec.environment)?;
        let env_path = root.join(format!("{}.{}", sanitize_filename(name), layout::ENV_EXTENSION));
        self.write_text(&env_path, &env)?;
        tracing::info!(
            "environment file has {} variables",
            project.spec.environment.variables.len()
        );

        let readme = self.readme_or_default(&project.spec.readme, name)?;
        self.write_text(&root.join(layout::README), &readme)?;

        let requirements = match self.api.get_project_requirements(&project.id) {
            Ok(reqs) => reqs,
            Err(err) => {
                tracing::warn!("could not fetch project requirements: {err}");
                Requirements::new()
            }
        };
        let doc = build_requirements(&requirements, &project.meta.intention);
        if !doc.is_empty() {
            self.write_json(&root.join(layout::REQUIREMENTS), &doc)?;
        }

        self.write_triggers(&project.spec.triggers)
    }

    fn write_triggers(&mut self, triggers: &IndexMap<String, Value>) -> Result<(), SyncError> {
        let wanted: Vec<(&str, &Value)> = layout::TRIGGER_KINDS
            .iter()
            .filter_map(|kind| triggers.get(*kind).map(|cfg| (*kind, cfg)))
            .filter(|(kind, cfg)| {
                let enabled = cfg.get("enabled").is_some_and(is_truthy);
                let has_nodes = cfg.get("nodes").is_some_and(is_truthy);
                if *kind == "chat" {
                    enabled
                } else {
                    enabled || has_nodes
                }
            })
            .collect();
        let dir = self.root.join(layout::TRIGGERS_DIR);
        for (kind, cfg) in wanted {
            self.write_json(&dir.join(format!("{kind}.json")), cfg)?;
        }
        Ok(())
    }

    fn distribute_modifiers(&mut self, modifiers: &IndexMap<String, Value>) -> Result<(), SyncError> {
        let mut per_folder: IndexMap<PathBuf, Vec<Value>> = IndexMap::new();
        for (path, bound) in modifiers {
            if !is_truthy(bound) {
                continue;
            }
            let Some(folder) = resolve_modifier_folder(&self.node_folders, path) else {
                tracing::debug!("no folder for modifier path {path}; dropped");
                continue;
            };
            let items = per_folder.entry(folder.clone()).or_default();
            match bound {
                Value::Array(list) => items.extend(list.iter().cloned()),
                other => items.push(other.clone()),
            }
        }
        for (folder, items) in per_folder {
            self.write_json(&folder.join(layout::MODIFIERS), &items)?;
            tracing::info!(
                "wrote modifiers to {}/",
                layout::relative_key(self.root, &folder)
            );
        }
        Ok(())
    }

    // -- components --------------------------------------------------------

    /// Write `component` into a new folder under `parent` and record it under
    /// `node_path`, then recurse into embedded children.
    fn materialize(
        &mut self,
        component: &Component,
        parent: &Path,
        reserved: &mut HashSet<String>,
        node_path: &str,
        fallback_id: Option<&str>,
    ) -> Result<(), SyncError> {
        let id = if component.id.is_empty() {
            fallback_id.unwrap_or_default().to_string()
        } else {
            component.id.clone()
        };
        let kind = component.kind();
        let name = component.meta.name.as_str();
        let owner = (!id.is_empty()).then_some(id.as_str());

        let dir_name = unique_dir_name(parent, name, reserved, owner);
        let dir = parent.join(&dir_name);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        self.node_folders.insert(node_path.to_string(), dir.clone());

        let depth = node_path.matches('/').count();
        tracing::info!("{}writing {kind}: {dir_name}/", "  ".repeat(depth));

        let readme = self.readme_or_default(component.payload.readme(), name)?;
        self.write_text(&dir.join(layout::README), &readme)?;

        let (checksum, runtime) = match &component.payload {
            Payload::Leaf(leaf) => {
                let file = format!("{}.{}", sanitize_filename(name), layout::SOURCE_EXTENSION);
                self.write_text(&dir.join(file), &leaf.source)?;
                if !leaf.requirements.trim().is_empty() {
                    self.write_text(&dir.join(layout::PIP_REQUIREMENTS), &leaf.requirements)?;
                }
                if let Some(doc) = schema_document(&leaf.inputs, &leaf.outputs) {
                    self.write_json(&dir.join(layout::IO), &doc)?;
                }
                (checksum_text(&leaf.source), Some(leaf.runtime.clone()))
            }
            Payload::Flow(flow) => {
                if let Some(doc) = schema_document(&flow.inputs, &flow.outputs) {
                    self.write_json(&dir.join(layout::IO), &doc)?;
                }
                let nodes = children_definition(kind, &flow.nodes);
                self.write_json(&dir.join(layout::NODES), &nodes)?;
                if is_truthy(&flow.io_nodes) {
                    self.write_json(&dir.join(layout::IO_NODES), &flow.io_nodes)?;
                }
                (checksum_json(&serde_json::to_value(&nodes)?), None)
            }
            Payload::Agent(agent) => {
                if let Some(doc) = schema_document(&agent.inputs, &agent.outputs) {
                    self.write_json(&dir.join(layout::IO), &doc)?;
                }
                let nodes = children_definition(kind, &agent.nodes);
                self.write_json(&dir.join(layout::NODES), &nodes)?;
                let has_prompts = ["system", "user"]
                    .iter()
                    .any(|k| agent.prompts.get(*k).is_some_and(is_truthy));
                if has_prompts {
                    self.write_json(&dir.join(layout::PROMPTS), &agent.prompts)?;
                }
                let mut settings = IndexMap::new();
                settings.insert("model", Value::String(agent.model.clone()));
                if is_truthy(&agent.settings) {
                    settings.insert("settings", agent.settings.clone());
                }
                self.write_json(&dir.join(layout::SETTINGS), &settings)?;
                (checksum_json(&serde_json::to_value(&nodes)?), None)
            }
        };

        let sidecar = ComponentSidecar {
            id: id.clone(),
            kind: Some(kind),
            node_key: Some(node_path.to_string()),
            name: Some(name.to_string()),
            runtime: runtime.clone(),
            starred: Some(component.meta.starred),
        };
        self.write_json(&dir.join(layout::SIDECAR), &sidecar)?;

        let requirements = if id.is_empty() {
            Requirements::new()
        } else {
            match self.api.get_component_requirements(&id) {
                Ok(reqs) => reqs,
                Err(err) => {
                    tracing::warn!("could not fetch requirements for {id}: {err}");
                    Requirements::new()
                }
            }
        };
        let doc = build_requirements(&requirements, &component.meta.intention);
        if !doc.is_empty() {
            self.write_json(&dir.join(layout::REQUIREMENTS), &doc)?;
        }

        self.state.insert(
            node_path.to_string(),
            StateEntry {
                directory: layout::relative_key(self.root, &dir),
                kind,
                remote_id: id,
                checksum,
                runtime,
                starred: Some(component.meta.starred),
            },
        );

        if let Some(children) = component.payload.children() {
            let mut child_reserved = HashSet::new();
            for (child_key, child) in children {
                let Some(nested) = child.spec.as_deref() else {
                    continue;
                };
                let child_path = format!("{node_path}/{child_key}");
                self.materialize(
                    nested,
                    &dir,
                    &mut child_reserved,
                    &child_path,
                    child.component_id.as_deref(),
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_put_description_first_and_skip_empty() {
        let mut reqs = Requirements::new();
        reqs.insert("safety".into(), json!("be kind"));
        reqs.insert("context".into(), json!(""));
        reqs.insert("outcomes".into(), json!(["greets"]));
        reqs.insert("unknown".into(), json!("ignored"));

        let doc = build_requirements(&reqs, "Says hello");
        let keys: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["description", "outcomes", "safety"]);
        assert!(build_requirements(&Requirements::new(), "").is_empty());
    }

    #[test]
    fn flow_children_get_position_and_loop_defaults() {
        let mut nodes = IndexMap::new();
        nodes.insert(
            "step".to_string(),
            ChildRef {
                component_id: Some("c-1".into()),
                inputs: json!({ "x": "{{input.x}}" }),
                ..ChildRef::default()
            },
        );
        let def = children_definition(ComponentKind::Flow, &nodes);
        assert_eq!(
            def["step"],
            json!({
                "component_id": "c-1",
                "inputs": { "x": "{{input.x}}" },
                "position": { "x": 0, "y": 0 },
                "loop": { "enabled": false }
            })
        );
    }

    #[test]
    fn agent_children_get_order_and_drop_embedded_spec() {
        let mut nodes = IndexMap::new();
        nodes.insert(
            "tool".to_string(),
            ChildRef {
                component_id: Some("c-2".into()),
                inputs: Value::Null,
                order: Some(json!(3)),
                spec: Some(Box::new(Component {
                    id: "c-2".into(),
                    meta: Default::default(),
                    payload: Payload::Leaf(Default::default()),
                })),
                ..ChildRef::default()
            },
        );
        let def = children_definition(ComponentKind::Agent, &nodes);
        assert_eq!(
            def["tool"],
            json!({ "component_id": "c-2", "inputs": {}, "order": 3 })
        );
    }

    #[test]
    fn modifier_path_falls_back_to_ancestor() {
        let mut folders = IndexMap::new();
        folders.insert("flowA".to_string(), PathBuf::from("/p/Flow A"));
        folders.insert("flowA/tool".to_string(), PathBuf::from("/p/Flow A/Tool"));

        assert_eq!(
            resolve_modifier_folder(&folders, "flowA/toolB"),
            Some(&PathBuf::from("/p/Flow A"))
        );
        assert_eq!(
            resolve_modifier_folder(&folders, "flowA/tool"),
            Some(&PathBuf::from("/p/Flow A/Tool"))
        );
        assert_eq!(resolve_modifier_folder(&folders, "other/x"), None);
    }
}

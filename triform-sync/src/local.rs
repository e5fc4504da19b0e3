//! Reading a component folder back into a typed record.
//!
//! Optional files default when absent. Optional JSON files that do not parse
//! are logged and treated as absent; a children definition that does not parse
//! fails the folder, since pushing it as empty would drop every child.

use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use triform_api::Requirements;
use triform_core::types::{DEFAULT_MODEL, DEFAULT_RUNTIME};
use triform_core::{
    layout, AgentSpec, ChildRef, ComponentKind, ComponentMeta, ComponentSidecar, FlowSpec,
    LeafSpec, Payload,
};
use triform_detector::FolderListing;

use crate::checksum::{checksum_json, checksum_text};
use crate::error::{io_err, SyncError};
use crate::naming::sanitize_filename;

/// A component folder as found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalComponent {
    pub meta: ComponentMeta,
    pub payload: Payload,
    pub checksum: String,
    /// `requirements.json` without the `description` key.
    pub requirements: Requirements,
}

impl LocalComponent {
    pub fn kind(&self) -> ComponentKind {
        self.payload.kind()
    }

    /// Spec object sent to the remote. Leaf schemas are computed remotely and
    /// are left out.
    pub fn wire_spec(&self) -> Value {
        match &self.payload {
            Payload::Leaf(leaf) => json!({
                "source": leaf.source,
                "requirements": leaf.requirements,
                "readme": leaf.readme,
                "runtime": leaf.runtime,
            }),
            other => other.to_spec(),
        }
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

pub(crate) fn read_text(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Parse an optional JSON file; unparseable content is logged and ignored.
pub(crate) fn read_json_lenient(path: &Path) -> Result<Option<Value>, SyncError> {
    let Some(text) = read_text(path)? else {
        return Ok(None);
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!("ignoring {}: {err}", path.display());
            Ok(None)
        }
    }
}

fn read_json_strict(path: &Path) -> Result<Option<Value>, SyncError> {
    let Some(text) = read_text(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| SyncError::InvalidLocalContent {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn field(value: Option<&Value>, key: &str) -> Option<Value> {
    value
        .and_then(|v| v.get(key))
        .filter(|v| !v.is_null())
        .cloned()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Requirements document split into the intention and the remaining sections.
pub(crate) fn split_requirements(value: Option<Value>) -> (String, Requirements) {
    let Some(Value::Object(mut map)) = value else {
        return (String::new(), Requirements::new());
    };
    let description = match map.remove(layout::DESCRIPTION_KEY) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    (description, map)
}

// ---------------------------------------------------------------------------
// Folder reader
// ---------------------------------------------------------------------------

/// Rebuild the component stored in `dir` as `kind`.
pub fn read_component(
    dir: &Path,
    kind: ComponentKind,
    sidecar: Option<&ComponentSidecar>,
) -> Result<LocalComponent, SyncError> {
    let readme = read_text(&dir.join(layout::README))?.unwrap_or_default();
    let io = read_json_lenient(&dir.join(layout::IO))?;
    let inputs = field(io.as_ref(), "inputs").unwrap_or_else(empty_object);
    let outputs = field(io.as_ref(), "outputs").unwrap_or_else(empty_object);
    let (intention, requirements) =
        split_requirements(read_json_lenient(&dir.join(layout::REQUIREMENTS))?);

    let folder_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let meta = ComponentMeta {
        name: sidecar
            .and_then(|s| s.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or(folder_name),
        intention,
        starred: sidecar.and_then(|s| s.starred).unwrap_or(false),
    };

    let (payload, checksum) = match kind {
        ComponentKind::Leaf => {
            let source = leaf_source(dir, sidecar)?;
            let mut requirements =
                read_text(&dir.join(layout::PIP_REQUIREMENTS))?.unwrap_or_default();
            if requirements.is_empty() {
                requirements =
                    read_text(&dir.join(layout::LEGACY_PIP_REQUIREMENTS))?.unwrap_or_default();
            }
            let checksum = checksum_text(&source);
            let leaf = LeafSpec {
                source,
                requirements,
                readme,
                runtime: sidecar
                    .and_then(|s| s.runtime.clone())
                    .unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
                inputs,
                outputs,
            };
            (Payload::Leaf(leaf), checksum)
        }
        ComponentKind::Flow => {
            let (nodes, checksum) = read_children(dir)?;
            let io_nodes = read_json_lenient(&dir.join(layout::IO_NODES))?
                .unwrap_or_else(|| json!({ "input": { "x": 0, "y": 0 }, "output": { "x": 0, "y": 0 } }));
            let flow = FlowSpec {
                readme,
                inputs,
                outputs,
                nodes,
                io_nodes,
            };
            (Payload::Flow(flow), checksum)
        }
        ComponentKind::Agent => {
            let (nodes, checksum) = read_children(dir)?;
            let prompts = read_json_lenient(&dir.join(layout::PROMPTS))?
                .unwrap_or_else(|| json!({ "system": [], "user": [] }));
            let settings_file = read_json_lenient(&dir.join(layout::SETTINGS))?;
            let model = field(settings_file.as_ref(), "model")
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string());
            let settings = field(settings_file.as_ref(), "settings").unwrap_or_else(empty_object);
            let agent = AgentSpec {
                readme,
                model,
                settings,
                prompts,
                nodes,
                inputs,
                outputs,
            };
            (Payload::Agent(agent), checksum)
        }
    };

    Ok(LocalComponent {
        meta,
        payload,
        checksum,
        requirements,
    })
}

/// Children definition of a composite folder and its checksum.
///
/// The checksum covers the file's JSON exactly as written, in canonical form.
fn read_children(dir: &Path) -> Result<(IndexMap<String, ChildRef>, String), SyncError> {
    let path = dir.join(layout::NODES);
    let raw = read_json_strict(&path)?.unwrap_or_else(empty_object);
    let checksum = checksum_json(&raw);
    let nodes = serde_json::from_value(raw).map_err(|e| SyncError::InvalidLocalContent {
        path,
        message: e.to_string(),
    })?;
    Ok((nodes, checksum))
}

/// Source text of a leaf folder: the file pull writes for the sidecar's
/// display name when it exists, else the first source file by name.
fn leaf_source(dir: &Path, sidecar: Option<&ComponentSidecar>) -> Result<String, SyncError> {
    let listing = FolderListing::read(dir)?;
    let named = sidecar
        .and_then(|s| s.name.as_deref())
        .filter(|n| !n.is_empty())
        .map(|n| format!("{}.{}", sanitize_filename(n), layout::SOURCE_EXTENSION))
        .filter(|file| listing.has(file));
    match named.as_deref().or_else(|| listing.source_file()) {
        Some(name) => Ok(read_text(&dir.join(name))?.unwrap_or_default()),
        None => Ok(String::new()),
    }
}

/// Checksum of the folder's current content, as push would compute it.
pub fn local_checksum(
    dir: &Path,
    kind: ComponentKind,
    sidecar: Option<&ComponentSidecar>,
) -> Result<String, SyncError> {
    match kind {
        ComponentKind::Leaf => Ok(checksum_text(&leaf_source(dir, sidecar)?)),
        ComponentKind::Flow | ComponentKind::Agent => Ok(read_children(dir)?.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn leaf_defaults_and_legacy_requirements() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Greet");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("greet.py"), "print('hi')").unwrap();
        fs::write(dir.join("requirements.txt"), "requests\n").unwrap();
        fs::write(dir.join("io.json"), "{ broken").unwrap();

        let local = read_component(&dir, ComponentKind::Leaf, None).unwrap();
        assert_eq!(local.meta.name, "Greet");
        assert_eq!(local.checksum, checksum_text("print('hi')"));
        let Payload::Leaf(leaf) = &local.payload else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.requirements, "requests\n");
        assert_eq!(leaf.runtime, DEFAULT_RUNTIME);
        assert_eq!(leaf.inputs, json!({}));
        assert_eq!(
            local.wire_spec(),
            json!({
                "source": "print('hi')",
                "requirements": "requests\n",
                "readme": "",
                "runtime": "python-3.13"
            })
        );
    }

    #[test]
    fn agent_defaults_when_files_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Bot");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("settings.json"), "{}").unwrap();

        let local = read_component(&dir, ComponentKind::Agent, None).unwrap();
        let Payload::Agent(agent) = &local.payload else {
            panic!("expected agent");
        };
        assert_eq!(agent.model, DEFAULT_MODEL);
        assert_eq!(agent.prompts, json!({ "system": [], "user": [] }));
        assert_eq!(agent.settings, json!({}));
        assert!(agent.nodes.is_empty());
        assert_eq!(local.checksum, checksum_json(&json!({})));
    }

    #[test]
    fn sidecar_supplies_name_runtime_and_star() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Step 2");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("step.py"), "x = 1").unwrap();
        fs::write(
            dir.join("requirements.json"),
            r#"{"description": "adds one", "context": "math"}"#,
        )
        .unwrap();
        let sidecar = ComponentSidecar {
            id: "c-2".into(),
            kind: Some(ComponentKind::Leaf),
            node_key: None,
            name: Some("Step".into()),
            runtime: Some("python-3.12".into()),
            starred: Some(true),
        };
        let local = read_component(&dir, ComponentKind::Leaf, Some(&sidecar)).unwrap();
        assert_eq!(local.meta.name, "Step");
        assert_eq!(local.meta.intention, "adds one");
        assert!(local.meta.starred);
        assert_eq!(local.requirements.get("context"), Some(&json!("math")));
        assert!(!local.requirements.contains_key("description"));
        assert_eq!(local.wire_spec()["runtime"], "python-3.12");
    }

    #[test]
    fn named_source_file_wins_over_stray_scripts() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Zeta");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("zeta.py"), "real = 1\n").unwrap();
        fs::write(dir.join("aaa_helper.py"), "stray = 1\n").unwrap();
        let sidecar = ComponentSidecar {
            id: "c-3".into(),
            kind: Some(ComponentKind::Leaf),
            node_key: None,
            name: Some("Zeta".into()),
            runtime: None,
            starred: None,
        };

        let local = read_component(&dir, ComponentKind::Leaf, Some(&sidecar)).unwrap();
        assert_eq!(local.wire_spec()["source"], "real = 1\n");
        assert_eq!(local.checksum, checksum_text("real = 1\n"));
        assert_eq!(
            local_checksum(&dir, ComponentKind::Leaf, Some(&sidecar)).unwrap(),
            local.checksum
        );

        // Without a sidecar name the first script by name is used.
        let unnamed = read_component(&dir, ComponentKind::Leaf, None).unwrap();
        assert_eq!(unnamed.checksum, checksum_text("stray = 1\n"));
        fs::remove_file(dir.join("zeta.py")).unwrap();
        let fallback = read_component(&dir, ComponentKind::Leaf, Some(&sidecar)).unwrap();
        assert_eq!(fallback.checksum, checksum_text("stray = 1\n"));
    }

    #[test]
    fn broken_children_definition_is_invalid_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("nodes.json"), "[1, 2").unwrap();
        let err = read_component(tmp.path(), ComponentKind::Flow, None).unwrap_err();
        assert!(matches!(err, SyncError::InvalidLocalContent { .. }));
    }
}

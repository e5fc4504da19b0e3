//! Domain types for Triform projects and their component trees.
//!
//! The remote service speaks a `{id, resource, meta, spec}` record per
//! component. Internally a [`Component`] carries a typed [`Payload`] instead of
//! the raw `resource` string, so every traversal dispatches on one enum.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::CoreError;

pub const DEFAULT_RUNTIME: &str = "python-3.13";
pub const DEFAULT_MODEL: &str = "gemma-3-27b-it";
pub const UNNAMED: &str = "unnamed";

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Treat an explicit JSON `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|name| !name.is_empty())
        .unwrap_or_else(default_name))
}

/// Embedded child payloads are best-effort: a nested record that does not
/// decode is treated as "not embedded" rather than failing the parent.
fn lenient_component<'de, D>(deserializer: D) -> Result<Option<Box<Component>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(is_truthy)
        .and_then(|v| serde_json::from_value::<Component>(v).ok())
        .map(Box::new))
}

fn default_name() -> String {
    UNNAMED.to_string()
}

fn default_runtime() -> String {
    DEFAULT_RUNTIME.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_prompts() -> Value {
    json!({ "system": [], "user": [] })
}

fn default_io_nodes() -> Value {
    json!({ "input": { "x": 0, "y": 0 }, "output": { "x": 0, "y": 0 } })
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are all falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// The three component variants.
///
/// Serialized as `action` / `flow` / `agent`; `leaf` is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    #[serde(rename = "action", alias = "leaf")]
    Leaf,
    #[serde(rename = "flow")]
    Flow,
    #[serde(rename = "agent")]
    Agent,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Leaf => "action",
            ComponentKind::Flow => "flow",
            ComponentKind::Agent => "agent",
        }
    }

    /// Remote `resource` discriminator.
    pub fn resource(self) -> &'static str {
        match self {
            ComponentKind::Leaf => "action/v1",
            ComponentKind::Flow => "flow/v1",
            ComponentKind::Agent => "agent/v1",
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        match resource {
            "action/v1" => Some(ComponentKind::Leaf),
            "flow/v1" => Some(ComponentKind::Flow),
            "agent/v1" => Some(ComponentKind::Agent),
            _ => None,
        }
    }

    pub fn is_composite(self) -> bool {
        !matches!(self, ComponentKind::Leaf)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "action" | "leaf" => Ok(ComponentKind::Leaf),
            "flow" => Ok(ComponentKind::Flow),
            "agent" => Ok(ComponentKind::Agent),
            other => Err(CoreError::Decode(format!(
                "unknown component kind '{other}'; expected: action, flow, agent"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Component metadata and payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMeta {
    #[serde(default = "default_name", deserialize_with = "null_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub intention: String,
    #[serde(default, deserialize_with = "null_default")]
    pub starred: bool,
}

impl Default for ComponentMeta {
    fn default() -> Self {
        Self {
            name: default_name(),
            intention: String::new(),
            starred: false,
        }
    }
}

/// Leaf (executable action) payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafSpec {
    #[serde(default, deserialize_with = "null_default")]
    pub source: String,
    /// Package requirements, one per line.
    #[serde(default, deserialize_with = "null_default")]
    pub requirements: String,
    #[serde(default, deserialize_with = "null_default")]
    pub readme: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default = "empty_object")]
    pub inputs: Value,
    #[serde(default = "empty_object")]
    pub outputs: Value,
}

impl Default for LeafSpec {
    fn default() -> Self {
        Self {
            source: String::new(),
            requirements: String::new(),
            readme: String::new(),
            runtime: default_runtime(),
            inputs: empty_object(),
            outputs: empty_object(),
        }
    }
}

/// Flow (composite orchestration) payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSpec {
    #[serde(default, deserialize_with = "null_default")]
    pub readme: String,
    #[serde(default = "empty_object")]
    pub inputs: Value,
    #[serde(default = "empty_object")]
    pub outputs: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub nodes: IndexMap<String, ChildRef>,
    #[serde(default = "default_io_nodes")]
    pub io_nodes: Value,
}

impl Default for FlowSpec {
    fn default() -> Self {
        Self {
            readme: String::new(),
            inputs: empty_object(),
            outputs: empty_object(),
            nodes: IndexMap::new(),
            io_nodes: default_io_nodes(),
        }
    }
}

/// Agent (model-driven composite) payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    #[serde(default, deserialize_with = "null_default")]
    pub readme: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "empty_object")]
    pub settings: Value,
    #[serde(default = "default_prompts")]
    pub prompts: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub nodes: IndexMap<String, ChildRef>,
    #[serde(default = "empty_object")]
    pub inputs: Value,
    #[serde(default = "empty_object")]
    pub outputs: Value,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            readme: String::new(),
            model: default_model(),
            settings: empty_object(),
            prompts: default_prompts(),
            nodes: IndexMap::new(),
            inputs: empty_object(),
            outputs: empty_object(),
        }
    }
}

/// A reference to a child component from a flow, an agent, or the project's
/// top-level node map.
///
/// `spec`, when present, is the fully resolved nested component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default = "empty_object")]
    pub inputs: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub loop_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_component",
        skip_serializing_if = "Option::is_none"
    )]
    pub spec: Option<Box<Component>>,
}

/// Kind-specific component content.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Leaf(LeafSpec),
    Flow(FlowSpec),
    Agent(AgentSpec),
}

impl Payload {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Payload::Leaf(_) => ComponentKind::Leaf,
            Payload::Flow(_) => ComponentKind::Flow,
            Payload::Agent(_) => ComponentKind::Agent,
        }
    }

    /// Child map for composites; `None` for leaves.
    pub fn children(&self) -> Option<&IndexMap<String, ChildRef>> {
        match self {
            Payload::Leaf(_) => None,
            Payload::Flow(flow) => Some(&flow.nodes),
            Payload::Agent(agent) => Some(&agent.nodes),
        }
    }

    pub fn readme(&self) -> &str {
        match self {
            Payload::Leaf(leaf) => &leaf.readme,
            Payload::Flow(flow) => &flow.readme,
            Payload::Agent(agent) => &agent.readme,
        }
    }

    /// Decode a raw `spec` object for the given kind.
    pub fn from_spec(kind: ComponentKind, spec: Value) -> Result<Self, serde_json::Error> {
        let spec = if spec.is_null() { empty_object() } else { spec };
        Ok(match kind {
            ComponentKind::Leaf => Payload::Leaf(serde_json::from_value(spec)?),
            ComponentKind::Flow => Payload::Flow(serde_json::from_value(spec)?),
            ComponentKind::Agent => Payload::Agent(serde_json::from_value(spec)?),
        })
    }

    /// Wire representation of the payload (the remote `spec` object).
    pub fn to_spec(&self) -> Value {
        let encoded = match self {
            Payload::Leaf(leaf) => serde_json::to_value(leaf),
            Payload::Flow(flow) => serde_json::to_value(flow),
            Payload::Agent(agent) => serde_json::to_value(agent),
        };
        encoded.unwrap_or_else(|_| empty_object())
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A remote component with its resolved payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComponent", into = "RawComponent")]
pub struct Component {
    pub id: String,
    pub meta: ComponentMeta,
    pub payload: Payload,
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        self.payload.kind()
    }
}

#[derive(Serialize, Deserialize)]
struct RawComponent {
    #[serde(default, deserialize_with = "null_default")]
    id: String,
    resource: String,
    #[serde(default, deserialize_with = "null_default")]
    meta: ComponentMeta,
    #[serde(default)]
    spec: Value,
}

impl TryFrom<RawComponent> for Component {
    type Error = CoreError;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        let kind = ComponentKind::from_resource(&raw.resource).ok_or_else(|| {
            CoreError::Decode(format!("unknown resource type '{}'", raw.resource))
        })?;
        let payload = Payload::from_spec(kind, raw.spec)
            .map_err(|e| CoreError::Decode(format!("{} spec: {e}", kind)))?;
        Ok(Component {
            id: raw.id,
            meta: raw.meta,
            payload,
        })
    }
}

impl From<Component> for RawComponent {
    fn from(component: Component) -> Self {
        RawComponent {
            id: component.id,
            resource: component.payload.kind().resource().to_string(),
            meta: component.meta,
            spec: component.payload.to_spec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default = "default_name", deserialize_with = "null_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub intention: String,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            name: default_name(),
            intention: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_default")]
    pub secret: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, deserialize_with = "null_default")]
    pub variables: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectSpec {
    #[serde(default, deserialize_with = "null_default")]
    pub readme: String,
    #[serde(default, deserialize_with = "null_default")]
    pub environment: Environment,
    /// Trigger configurations keyed by trigger kind (`endpoints`, `chat`, `scheduled`).
    #[serde(default, deserialize_with = "null_default")]
    pub triggers: IndexMap<String, Value>,
    /// Modifier bindings keyed by slash-joined node path.
    #[serde(default, deserialize_with = "null_default")]
    pub modifiers: IndexMap<String, Value>,
    #[serde(default, deserialize_with = "null_default")]
    pub nodes: IndexMap<String, ChildRef>,
}

/// A remote project with its top-level node map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub meta: ProjectMeta,
    #[serde(default, deserialize_with = "null_default")]
    pub spec: ProjectSpec,
}

// ---------------------------------------------------------------------------
// Identity sidecar
// ---------------------------------------------------------------------------

/// Per-folder identity marker (`meta.json`).
///
/// Ties a local folder to a remote component id. Older pulls did not write
/// one; those folders are matched through the sync state instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSidecar {
    #[serde(alias = "component_id")]
    pub id: String,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ComponentKind>,
    #[serde(default, alias = "node_key", skip_serializing_if = "Option::is_none")]
    pub node_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn decodes_action_record() {
        let raw = json!({
            "id": "c-1",
            "resource": "action/v1",
            "meta": { "name": "Greet", "intention": "say hi", "starred": true },
            "spec": { "source": "print('hi')", "requirements": "requests\n" }
        });
        let component: Component = serde_json::from_value(raw).unwrap();
        assert_eq!(component.kind(), ComponentKind::Leaf);
        assert_eq!(component.meta.name, "Greet");
        assert!(component.meta.starred);
        let Payload::Leaf(leaf) = &component.payload else {
            panic!("expected leaf payload");
        };
        assert_eq!(leaf.source, "print('hi')");
        assert_eq!(leaf.runtime, DEFAULT_RUNTIME);
        assert_eq!(leaf.inputs, json!({}));
    }

    #[test]
    fn decodes_nested_flow_with_embedded_child() {
        let raw = json!({
            "id": "f-1",
            "resource": "flow/v1",
            "meta": { "name": "Pipeline" },
            "spec": {
                "nodes": {
                    "step": {
                        "component_id": "c-2",
                        "inputs": { "x": "$.input" },
                        "position": { "x": 10, "y": 20 },
                        "spec": { "id": "c-2", "resource": "action/v1", "meta": { "name": "Step" }, "spec": {} }
                    }
                }
            }
        });
        let component: Component = serde_json::from_value(raw).unwrap();
        let children = component.payload.children().unwrap();
        let step = &children["step"];
        assert_eq!(step.component_id.as_deref(), Some("c-2"));
        let nested = step.spec.as_ref().expect("embedded child");
        assert_eq!(nested.kind(), ComponentKind::Leaf);
        assert_eq!(nested.meta.name, "Step");
    }

    #[test]
    fn undecodable_embedded_child_is_dropped() {
        let raw = json!({
            "id": "f-1",
            "resource": "flow/v1",
            "spec": { "nodes": { "a": { "component_id": "x", "spec": { "resource": "bogus/v9" } } } }
        });
        let component: Component = serde_json::from_value(raw).unwrap();
        let child = &component.payload.children().unwrap()["a"];
        assert!(child.spec.is_none());
        assert_eq!(child.component_id.as_deref(), Some("x"));
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let raw = json!({ "id": "z", "resource": "widget/v1", "spec": {} });
        let err = serde_json::from_value::<Component>(raw).unwrap_err();
        assert!(err.to_string().contains("widget/v1"));
    }

    #[test]
    fn null_fields_take_defaults() {
        let raw = json!({
            "id": "a-1",
            "resource": "agent/v1",
            "meta": { "name": null, "intention": null },
            "spec": { "readme": null, "nodes": null }
        });
        let component: Component = serde_json::from_value(raw).unwrap();
        assert_eq!(component.meta.name, UNNAMED);
        let Payload::Agent(agent) = &component.payload else {
            panic!("expected agent payload");
        };
        assert_eq!(agent.model, DEFAULT_MODEL);
        assert_eq!(agent.prompts, json!({ "system": [], "user": [] }));
        assert!(agent.nodes.is_empty());
    }

    #[test]
    fn serializes_back_to_resource_record() {
        let component = Component {
            id: "f-9".into(),
            meta: ComponentMeta::default(),
            payload: Payload::Flow(FlowSpec::default()),
        };
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["resource"], "flow/v1");
        assert_eq!(value["id"], "f-9");
        assert_eq!(value["spec"]["io_nodes"]["input"], json!({ "x": 0, "y": 0 }));
    }

    #[test]
    fn project_preserves_declared_node_order() {
        let raw = json!({
            "id": "p-1",
            "ownedBy": "org-1",
            "meta": { "name": "Demo" },
            "spec": { "nodes": { "zeta": {}, "alpha": {}, "mid": {} } }
        });
        let project: Project = serde_json::from_value(raw).unwrap();
        let keys: Vec<_> = project.spec.nodes.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(project.owned_by.as_deref(), Some("org-1"));
    }

    #[test]
    fn sidecar_accepts_legacy_field_names() {
        let sidecar: ComponentSidecar =
            serde_json::from_str(r#"{"component_id":"c-7","type":"leaf","node_key":"a/b"}"#)
                .unwrap();
        assert_eq!(sidecar.id, "c-7");
        assert_eq!(sidecar.kind, Some(ComponentKind::Leaf));
        assert_eq!(sidecar.node_key.as_deref(), Some("a/b"));
    }

    #[rstest]
    #[case("action", ComponentKind::Leaf)]
    #[case("leaf", ComponentKind::Leaf)]
    #[case("Flow", ComponentKind::Flow)]
    #[case("AGENT", ComponentKind::Agent)]
    fn kind_parses_from_str(#[case] input: &str, #[case] expected: ComponentKind) {
        assert_eq!(input.parse::<ComponentKind>().unwrap(), expected);
    }

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!({}), false)]
    #[case(json!([]), false)]
    #[case(json!(""), false)]
    #[case(json!(0), false)]
    #[case(json!({ "a": 1 }), true)]
    #[case(json!("x"), true)]
    #[case(json!(true), true)]
    fn truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected);
    }
}

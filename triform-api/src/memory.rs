//! In-memory [`RemoteApi`] used for offline runs and tests.
//!
//! Components are stored flat by id; `get_component` embeds children from the
//! store up to the requested depth, the same shape the service returns.
//! Every mutating call is recorded, and any operation can be told to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use triform_core::{Component, ComponentKind, ComponentMeta, Payload, Project};

use crate::client::{ops, RemoteApi};
use crate::error::ApiError;
use crate::types::{Execution, Membership, ProjectMetaUpdate, Requirements};

/// A mutating call as received by [`MemoryApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub target: String,
    pub body: Value,
}

#[derive(Default)]
struct Store {
    projects: Vec<Project>,
    components: HashMap<String, Component>,
    component_requirements: HashMap<String, Requirements>,
    project_requirements: HashMap<String, Requirements>,
    memberships: Vec<Membership>,
    executions: Vec<Execution>,
    failing: HashSet<String>,
    calls: Vec<RecordedCall>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryApi {
    store: Mutex<Store>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_project(&self, project: Project) {
        let mut store = self.lock();
        store.projects.retain(|p| p.id != project.id);
        store.projects.push(project);
    }

    /// Store a component. Embedded children are stored too, so the record can
    /// be passed in fully resolved.
    pub fn insert_component(&self, component: Component) {
        let mut store = self.lock();
        flatten_into(&mut store.components, component);
    }

    pub fn set_component_requirements(&self, id: &str, data: Requirements) {
        self.lock()
            .component_requirements
            .insert(id.to_string(), data);
    }

    pub fn set_project_requirements(&self, id: &str, data: Requirements) {
        self.lock().project_requirements.insert(id.to_string(), data);
    }

    pub fn add_membership(&self, membership: Membership) {
        self.lock().memberships.push(membership);
    }

    pub fn add_execution(&self, execution: Execution) {
        self.lock().executions.push(execution);
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail(&self, operation: &str) {
        self.lock().failing.insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.lock().failing.remove(operation);
    }

    /// All recorded mutating calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, operation: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Stored (flat) component record.
    pub fn component(&self, id: &str) -> Option<Component> {
        self.lock().components.get(id).cloned()
    }

    pub fn component_requirements(&self, id: &str) -> Option<Requirements> {
        self.lock().component_requirements.get(id).cloned()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.lock().projects.iter().find(|p| p.id == id).cloned()
    }
}

fn check(store: &Store, operation: &str) -> Result<(), ApiError> {
    if store.failing.contains(operation) {
        return Err(ApiError::call(operation, "injected failure"));
    }
    Ok(())
}

fn record(store: &mut Store, operation: &str, target: &str, body: Value) {
    store.calls.push(RecordedCall {
        operation: operation.to_string(),
        target: target.to_string(),
        body,
    });
}

fn flatten_into(components: &mut HashMap<String, Component>, mut component: Component) {
    let children = match &mut component.payload {
        Payload::Leaf(_) => None,
        Payload::Flow(flow) => Some(&mut flow.nodes),
        Payload::Agent(agent) => Some(&mut agent.nodes),
    };
    if let Some(children) = children {
        for child in children.values_mut() {
            if let Some(nested) = child.spec.take() {
                if child.component_id.is_none() {
                    child.component_id = Some(nested.id.clone());
                }
                flatten_into(components, *nested);
            }
        }
    }
    components.insert(component.id.clone(), component);
}

fn resolve(components: &HashMap<String, Component>, id: &str, depth: u32) -> Option<Component> {
    let mut component = components.get(id)?.clone();
    if depth == 0 {
        return Some(component);
    }
    let children = match &mut component.payload {
        Payload::Leaf(_) => None,
        Payload::Flow(flow) => Some(&mut flow.nodes),
        Payload::Agent(agent) => Some(&mut agent.nodes),
    };
    if let Some(children) = children {
        for child in children.values_mut() {
            if let Some(child_id) = child.component_id.as_deref() {
                child.spec = resolve(components, child_id, depth - 1).map(Box::new);
            }
        }
    }
    Some(component)
}

fn merge_spec(base: Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (k, v) in patch {
                base.insert(k.clone(), v.clone());
            }
            Value::Object(base)
        }
        (_, patch) => patch.clone(),
    }
}

impl RemoteApi for MemoryApi {
    fn get_project(&self, id: &str) -> Result<Option<Project>, ApiError> {
        let store = self.lock();
        check(&store, ops::GET_PROJECT)?;
        Ok(store.projects.iter().find(|p| p.id == id).cloned())
    }

    fn update_project(
        &self,
        id: &str,
        meta: &ProjectMetaUpdate,
        spec: Option<&Value>,
    ) -> Result<(), ApiError> {
        let mut store = self.lock();
        check(&store, ops::UPDATE_PROJECT)?;
        let Some(project) = store.projects.iter_mut().find(|p| p.id == id) else {
            return Err(ApiError::call(ops::UPDATE_PROJECT, format!("project {id} not found")));
        };
        project.meta.name = meta.name.clone();
        if let Some(intention) = &meta.intention {
            project.meta.intention = intention.clone();
        }
        let mut body = Map::new();
        body.insert("meta".into(), serde_json::to_value(meta).unwrap_or_default());
        if let Some(spec) = spec {
            body.insert("spec".into(), spec.clone());
        }
        record(&mut store, ops::UPDATE_PROJECT, id, Value::Object(body));
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let store = self.lock();
        check(&store, ops::LIST_PROJECTS)?;
        Ok(store.projects.clone())
    }

    fn get_component(&self, id: &str, depth: u32) -> Result<Option<Component>, ApiError> {
        let store = self.lock();
        check(&store, ops::GET_COMPONENT)?;
        Ok(resolve(&store.components, id, depth))
    }

    fn create_component(
        &self,
        kind: ComponentKind,
        meta: &ComponentMeta,
        spec: &Value,
    ) -> Result<String, ApiError> {
        let mut store = self.lock();
        check(&store, ops::CREATE_COMPONENT)?;
        let payload = Payload::from_spec(kind, spec.clone())
            .map_err(|e| ApiError::call(ops::CREATE_COMPONENT, e.to_string()))?;
        store.next_id += 1;
        let id = format!("mem-{}", store.next_id);
        store.components.insert(
            id.clone(),
            Component {
                id: id.clone(),
                meta: meta.clone(),
                payload,
            },
        );
        record(
            &mut store,
            ops::CREATE_COMPONENT,
            &id,
            serde_json::json!({ "resource": kind.resource(), "meta": meta, "spec": spec }),
        );
        Ok(id)
    }

    fn update_component(
        &self,
        id: &str,
        meta: &ComponentMeta,
        spec: &Value,
    ) -> Result<(), ApiError> {
        let mut store = self.lock();
        check(&store, ops::UPDATE_COMPONENT)?;
        let Some(existing) = store.components.get(id) else {
            return Err(ApiError::call(ops::UPDATE_COMPONENT, format!("component {id} not found")));
        };
        let kind = existing.kind();
        let merged = merge_spec(existing.payload.to_spec(), spec);
        let payload = Payload::from_spec(kind, merged)
            .map_err(|e| ApiError::call(ops::UPDATE_COMPONENT, e.to_string()))?;
        store.components.insert(
            id.to_string(),
            Component {
                id: id.to_string(),
                meta: meta.clone(),
                payload,
            },
        );
        record(
            &mut store,
            ops::UPDATE_COMPONENT,
            id,
            serde_json::json!({ "meta": meta, "spec": spec }),
        );
        Ok(())
    }

    fn get_component_requirements(&self, id: &str) -> Result<Requirements, ApiError> {
        let store = self.lock();
        check(&store, ops::GET_COMPONENT_REQUIREMENTS)?;
        Ok(store.component_requirements.get(id).cloned().unwrap_or_default())
    }

    fn update_component_requirements(
        &self,
        id: &str,
        data: &Requirements,
    ) -> Result<(), ApiError> {
        let mut store = self.lock();
        check(&store, ops::UPDATE_COMPONENT_REQUIREMENTS)?;
        store
            .component_requirements
            .insert(id.to_string(), data.clone());
        record(
            &mut store,
            ops::UPDATE_COMPONENT_REQUIREMENTS,
            id,
            Value::Object(data.clone()),
        );
        Ok(())
    }

    fn get_project_requirements(&self, id: &str) -> Result<Requirements, ApiError> {
        let store = self.lock();
        check(&store, ops::GET_PROJECT_REQUIREMENTS)?;
        Ok(store.project_requirements.get(id).cloned().unwrap_or_default())
    }

    fn update_project_requirements(&self, id: &str, data: &Requirements) -> Result<(), ApiError> {
        let mut store = self.lock();
        check(&store, ops::UPDATE_PROJECT_REQUIREMENTS)?;
        store
            .project_requirements
            .insert(id.to_string(), data.clone());
        record(
            &mut store,
            ops::UPDATE_PROJECT_REQUIREMENTS,
            id,
            Value::Object(data.clone()),
        );
        Ok(())
    }

    fn list_memberships(&self) -> Result<Vec<Membership>, ApiError> {
        let store = self.lock();
        check(&store, ops::LIST_MEMBERSHIPS)?;
        Ok(store.memberships.clone())
    }

    fn list_executions(&self, limit: usize) -> Result<Vec<Execution>, ApiError> {
        let store = self.lock();
        check(&store, ops::LIST_EXECUTIONS)?;
        Ok(store.executions.iter().take(limit).cloned().collect())
    }
}

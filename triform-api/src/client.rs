//! The [`RemoteApi`] trait: every remote operation the sync engine performs.

use serde_json::Value;

use triform_core::{Component, ComponentKind, ComponentMeta, Project};

use crate::error::ApiError;
use crate::types::{Execution, Membership, ProjectMetaUpdate, Requirements};

/// Operation names carried by [`ApiError::CallFailed`].
pub mod ops {
    pub const GET_PROJECT: &str = "getProject";
    pub const UPDATE_PROJECT: &str = "updateProject";
    pub const LIST_PROJECTS: &str = "listProjects";
    pub const GET_COMPONENT: &str = "getComponent";
    pub const CREATE_COMPONENT: &str = "createComponent";
    pub const UPDATE_COMPONENT: &str = "updateComponent";
    pub const GET_COMPONENT_REQUIREMENTS: &str = "getComponentRequirements";
    pub const UPDATE_COMPONENT_REQUIREMENTS: &str = "updateComponentRequirements";
    pub const GET_PROJECT_REQUIREMENTS: &str = "getProjectRequirements";
    pub const UPDATE_PROJECT_REQUIREMENTS: &str = "updateProjectRequirements";
    pub const LIST_MEMBERSHIPS: &str = "listMemberships";
    pub const LIST_EXECUTIONS: &str = "listExecutions";
}

/// Depth passed to [`RemoteApi::get_component`] to resolve a whole subtree.
pub const FULL_DEPTH: u32 = 999;

/// Blocking access to the remote service.
///
/// Calls are independent and never retried; a failure surfaces immediately.
/// `Ok(None)` from a getter means the record does not exist.
pub trait RemoteApi: Send + Sync {
    fn get_project(&self, id: &str) -> Result<Option<Project>, ApiError>;

    fn update_project(
        &self,
        id: &str,
        meta: &ProjectMetaUpdate,
        spec: Option<&Value>,
    ) -> Result<(), ApiError>;

    fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    /// Fetch a component with nested children embedded up to `depth` levels.
    fn get_component(&self, id: &str, depth: u32) -> Result<Option<Component>, ApiError>;

    /// Create a component and return its new id.
    fn create_component(
        &self,
        kind: ComponentKind,
        meta: &ComponentMeta,
        spec: &Value,
    ) -> Result<String, ApiError>;

    fn update_component(&self, id: &str, meta: &ComponentMeta, spec: &Value)
        -> Result<(), ApiError>;

    fn get_component_requirements(&self, id: &str) -> Result<Requirements, ApiError>;

    fn update_component_requirements(&self, id: &str, data: &Requirements)
        -> Result<(), ApiError>;

    fn get_project_requirements(&self, id: &str) -> Result<Requirements, ApiError>;

    fn update_project_requirements(&self, id: &str, data: &Requirements) -> Result<(), ApiError>;

    fn list_memberships(&self) -> Result<Vec<Membership>, ApiError>;

    fn list_executions(&self, limit: usize) -> Result<Vec<Execution>, ApiError>;
}

//! HTTP implementation of [`RemoteApi`] over a blocking `ureq` agent.
//!
//! | Operation                     | Request                                  |
//! |-------------------------------|------------------------------------------|
//! | getProject                    | `GET    /projects/{id}`                  |
//! | updateProject                 | `PATCH  /projects/{id}`                  |
//! | listProjects                  | `GET    /projects`                       |
//! | get/updateProjectRequirements | `GET\|PUT /projects/{id}/requirements`   |
//! | getComponent                  | `GET    /components/{id}?depth={depth}`  |
//! | createComponent               | `POST   /components`                     |
//! | updateComponent               | `PATCH  /components/{id}`                |
//! | get/updateComponentRequirements | `GET\|PUT /components/{id}/requirements` |
//! | listMemberships               | `GET    /memberships`                    |
//! | listExecutions                | `GET    /executions?limit={n}`           |
//!
//! The session token travels as a cookie; a `404` on a getter maps to `Ok(None)`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use triform_core::settings::{self, Settings};
use triform_core::{Component, ComponentKind, ComponentMeta, Project};

use crate::client::{ops, RemoteApi};
use crate::error::ApiError;
use crate::types::{Execution, Membership, ProjectMetaUpdate, Requirements};

pub const SESSION_COOKIE: &str = "__Secure-better-auth.session_token";

/// Remote service client.
pub struct HttpApi {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

/// List endpoints answer either a bare array or a `{data: [...]}` wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "items", alias = "results")]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent,
            base_url,
            token,
        }
    }

    /// Client for the configured endpoint, authenticated from `TRIFORM_TOKEN`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.api_url.clone(),
            settings::token_from_env(),
            settings.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Cookie", &format!("{SESSION_COOKIE}={token}")),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, op: &str, path: &str) -> Result<Option<T>, ApiError> {
        tracing::debug!("{op}: GET {path}");
        match self.request("GET", path).call() {
            Ok(response) => decode(op, response).map(Some),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(call_error(op, err)),
        }
    }

    fn list<T: DeserializeOwned>(&self, op: &str, path: &str) -> Result<Vec<T>, ApiError> {
        Ok(self
            .get::<Option<Listing<T>>>(op, path)?
            .flatten()
            .map(Listing::into_vec)
            .unwrap_or_default())
    }

    fn requirements(&self, op: &str, path: &str) -> Result<Requirements, ApiError> {
        Ok(match self.get::<Value>(op, path)? {
            Some(Value::Object(map)) => map,
            _ => Requirements::new(),
        })
    }

    fn send(&self, op: &str, method: &str, path: &str, body: &Value) -> Result<Value, ApiError> {
        tracing::debug!("{op}: {method} {path}");
        match self.request(method, path).send_json(body) {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| ApiError::call(op, format!("reading response: {e}")))?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&text)
                    .map_err(|e| ApiError::call(op, format!("invalid response: {e}")))
            }
            Err(err) => Err(call_error(op, err)),
        }
    }
}

fn decode<T: DeserializeOwned>(op: &str, response: ureq::Response) -> Result<T, ApiError> {
    let text = response
        .into_string()
        .map_err(|e| ApiError::call(op, format!("reading response: {e}")))?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| ApiError::call(op, format!("invalid response: {e}")))
}

fn call_error(op: &str, err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| match body.trim() {
                    "" => format!("HTTP {code}"),
                    text => format!("HTTP {code}: {text}"),
                });
            ApiError::call(op, message)
        }
        ureq::Error::Transport(transport) => ApiError::call(op, transport.to_string()),
    }
}

fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error");
    error
        .and_then(|e| e.get("message"))
        .or(error)
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl RemoteApi for HttpApi {
    fn get_project(&self, id: &str) -> Result<Option<Project>, ApiError> {
        Ok(self
            .get::<Option<Project>>(ops::GET_PROJECT, &format!("/projects/{id}"))?
            .flatten())
    }

    fn update_project(
        &self,
        id: &str,
        meta: &ProjectMetaUpdate,
        spec: Option<&Value>,
    ) -> Result<(), ApiError> {
        let mut body = json!({ "meta": meta });
        if let Some(spec) = spec {
            body["spec"] = spec.clone();
        }
        self.send(ops::UPDATE_PROJECT, "PATCH", &format!("/projects/{id}"), &body)?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.list(ops::LIST_PROJECTS, "/projects")
    }

    fn get_component(&self, id: &str, depth: u32) -> Result<Option<Component>, ApiError> {
        Ok(self
            .get::<Option<Component>>(
                ops::GET_COMPONENT,
                &format!("/components/{id}?depth={depth}"),
            )?
            .flatten())
    }

    fn create_component(
        &self,
        kind: ComponentKind,
        meta: &ComponentMeta,
        spec: &Value,
    ) -> Result<String, ApiError> {
        let body = json!({ "resource": kind.resource(), "meta": meta, "spec": spec });
        let response = self.send(ops::CREATE_COMPONENT, "POST", "/components", &body)?;
        response
            .get("id")
            .or_else(|| response.pointer("/component/id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::call(ops::CREATE_COMPONENT, "response missing component id"))
    }

    fn update_component(
        &self,
        id: &str,
        meta: &ComponentMeta,
        spec: &Value,
    ) -> Result<(), ApiError> {
        let body = json!({ "meta": meta, "spec": spec });
        self.send(
            ops::UPDATE_COMPONENT,
            "PATCH",
            &format!("/components/{id}"),
            &body,
        )?;
        Ok(())
    }

    fn get_component_requirements(&self, id: &str) -> Result<Requirements, ApiError> {
        self.requirements(
            ops::GET_COMPONENT_REQUIREMENTS,
            &format!("/components/{id}/requirements"),
        )
    }

    fn update_component_requirements(
        &self,
        id: &str,
        data: &Requirements,
    ) -> Result<(), ApiError> {
        self.send(
            ops::UPDATE_COMPONENT_REQUIREMENTS,
            "PUT",
            &format!("/components/{id}/requirements"),
            &Value::Object(data.clone()),
        )?;
        Ok(())
    }

    fn get_project_requirements(&self, id: &str) -> Result<Requirements, ApiError> {
        self.requirements(
            ops::GET_PROJECT_REQUIREMENTS,
            &format!("/projects/{id}/requirements"),
        )
    }

    fn update_project_requirements(&self, id: &str, data: &Requirements) -> Result<(), ApiError> {
        self.send(
            ops::UPDATE_PROJECT_REQUIREMENTS,
            "PUT",
            &format!("/projects/{id}/requirements"),
            &Value::Object(data.clone()),
        )?;
        Ok(())
    }

    fn list_memberships(&self) -> Result<Vec<Membership>, ApiError> {
        self.list(ops::LIST_MEMBERSHIPS, "/memberships")
    }

    fn list_executions(&self, limit: usize) -> Result<Vec<Execution>, ApiError> {
        self.list(ops::LIST_EXECUTIONS, &format!("/executions?limit={limit}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let api = HttpApi::new("http://localhost:1/api/", None, Duration::from_secs(1));
        assert_eq!(api.base_url(), "http://localhost:1/api");
    }

    #[test]
    fn error_message_prefers_nested_message() {
        let body = json!({ "error": { "message": "token expired" } });
        assert_eq!(error_message(&body).as_deref(), Some("token expired"));
        let flat = json!({ "error": "forbidden" });
        assert_eq!(error_message(&flat).as_deref(), Some("forbidden"));
        let top = json!({ "message": "nope" });
        assert_eq!(error_message(&top).as_deref(), Some("nope"));
        assert_eq!(error_message(&json!({ "ok": false })), None);
    }

    #[test]
    fn listing_accepts_bare_and_wrapped() {
        let bare: Listing<u8> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(bare.into_vec(), vec![1, 2]);
        let wrapped: Listing<u8> = serde_json::from_str(r#"{"data":[3]}"#).unwrap();
        assert_eq!(wrapped.into_vec(), vec![3]);
    }

    #[test]
    fn unreachable_host_is_call_failed() {
        let api = HttpApi::new("http://127.0.0.1:9", None, Duration::from_millis(200));
        let err = api.list_projects().unwrap_err();
        assert_eq!(err.operation(), ops::LIST_PROJECTS);
    }
}

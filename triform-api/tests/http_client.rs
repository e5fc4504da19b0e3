//! `HttpApi` request/response mapping against a mock server.

use std::time::Duration;

use serde_json::json;
use triform_api::{ops, HttpApi, ProjectMetaUpdate, RemoteApi};
use triform_core::{ComponentKind, ComponentMeta};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpApi {
    HttpApi::new(
        server.uri(),
        Some("tok-123".to_string()),
        Duration::from_secs(5),
    )
}

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("join blocking call")
}

#[tokio::test(flavor = "multi_thread")]
async fn get_project_sends_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1"))
        .and(header(
            "Cookie",
            "__Secure-better-auth.session_token=tok-123",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p-1",
            "ownedBy": "org-1",
            "meta": { "name": "Demo" },
            "spec": { "nodes": { "greet": { "component_id": "c-1" } } }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let project = blocking(move || api.get_project("p-1"))
        .await
        .expect("call")
        .expect("project present");
    assert_eq!(project.meta.name, "Demo");
    assert!(project.spec.nodes.contains_key("greet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_project_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server);
    let project = blocking(move || api.get_project("nope")).await.expect("call");
    assert!(project.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_carries_operation_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/components/c-1"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "error": { "message": "database unavailable" } })),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    let err = blocking(move || api.get_component("c-1", 3))
        .await
        .unwrap_err();
    assert_eq!(err.operation(), ops::GET_COMPONENT);
    assert!(err.to_string().contains("database unavailable"), "got: {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn get_component_passes_depth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/components/c-1"))
        .and(query_param("depth", "999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c-1", "resource": "action/v1", "meta": { "name": "Greet" },
            "spec": { "source": "print('hi')" }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let component = blocking(move || api.get_component("c-1", triform_api::FULL_DEPTH))
        .await
        .expect("call")
        .expect("component");
    assert_eq!(component.kind(), ComponentKind::Leaf);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_component_returns_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/components"))
        .and(body_json(json!({
            "resource": "flow/v1",
            "meta": { "name": "New Flow", "intention": "", "starred": false },
            "spec": { "nodes": {} }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "c-new" })))
        .mount(&server)
        .await;

    let api = client(&server);
    let meta = ComponentMeta {
        name: "New Flow".into(),
        ..ComponentMeta::default()
    };
    let id = blocking(move || {
        api.create_component(ComponentKind::Flow, &meta, &json!({ "nodes": {} }))
    })
    .await
    .expect("create");
    assert_eq!(id, "c-new");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_project_sends_meta_only() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/projects/p-1"))
        .and(body_json(json!({ "meta": { "name": "Demo", "intention": "greets" } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let meta = ProjectMetaUpdate {
        name: "Demo".into(),
        intention: Some("greets".into()),
    };
    blocking(move || api.update_project("p-1", &meta, None))
        .await
        .expect("update");
}

#[tokio::test(flavor = "multi_thread")]
async fn list_endpoints_accept_wrapped_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/executions"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "e-1", "state": "completed", "createdAt": "2026-01-01T00:00:00Z" },
                { "id": "e-2", "state": "failed" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/memberships"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "organization": { "id": "org-1", "name": "Acme" } }
        ])))
        .mount(&server)
        .await;

    let api = client(&server);
    let (executions, memberships) =
        blocking(move || (api.list_executions(2), api.list_memberships())).await;
    let executions = executions.expect("executions");
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[1].state.as_deref(), Some("failed"));
    assert_eq!(memberships.expect("memberships")[0].organization.name, "Acme");
}

#[tokio::test(flavor = "multi_thread")]
async fn requirements_null_body_is_empty_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/components/c-1/requirements"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let api = client(&server);
    let reqs = blocking(move || api.get_component_requirements("c-1"))
        .await
        .expect("requirements");
    assert!(reqs.is_empty());
}

//! Shared fixtures for the sync integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use triform_api::{MemoryApi, Membership, Organization};
use triform_core::{Component, Project};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn component(raw: Value) -> Component {
    serde_json::from_value(raw).expect("component fixture")
}

pub fn project(raw: Value) -> Project {
    serde_json::from_value(raw).expect("project fixture")
}

/// Project `p1` with a single leaf node `greet` and no environment.
pub fn greet_api() -> MemoryApi {
    let api = MemoryApi::new();
    api.insert_project(project(json!({
        "id": "P1",
        "meta": { "name": "Hello" },
        "spec": { "nodes": { "greet": { "component_id": "leaf-greet" } } }
    })));
    api.insert_component(component(json!({
        "id": "leaf-greet",
        "resource": "action/v1",
        "meta": { "name": "greet" },
        "spec": { "source": "print('hi')" }
    })));
    api
}

/// Project `p1`: a leaf, a flow with three children all named "Step", and an
/// agent with one tool. Owned by `org-2`.
pub fn demo_api() -> MemoryApi {
    let api = MemoryApi::new();
    api.insert_project(project(json!({
        "id": "p1",
        "ownedBy": "org-2",
        "meta": { "name": "Demo Project", "intention": "Shows everything" },
        "spec": {
            "readme": "# Demo\n\nA project.\n",
            "environment": { "variables": [
                { "key": "REGION", "value": "eu-west-1", "secret": false },
                { "key": "API_KEY", "value": "", "secret": true }
            ] },
            "triggers": {
                "endpoints": { "enabled": true, "nodes": ["greet"] },
                "chat": { "enabled": false, "nodes": ["bot"] },
                "scheduled": { "enabled": false, "nodes": [] }
            },
            "modifiers": {
                "flow/step9": [{ "type": "storage" }],
                "bot/tool": [{ "type": "oauth", "provider": "github" }],
                "ghost": [{ "type": "oauth" }]
            },
            "nodes": {
                "greet": { "component_id": "leaf-greet" },
                "flow": { "component_id": "flow-1" },
                "bot": { "component_id": "agent-1" }
            }
        }
    })));
    api.insert_component(component(json!({
        "id": "leaf-greet",
        "resource": "action/v1",
        "meta": { "name": "greet", "intention": "Says hi", "starred": true },
        "spec": {
            "source": "print('hi')\n",
            "requirements": "requests==2.32\n",
            "inputs": { "name": { "type": "string" } }
        }
    })));
    for (id, source) in [("leaf-a", "a = 1\n"), ("leaf-b", "b = 2\n"), ("leaf-c", "c = 3\n")] {
        api.insert_component(component(json!({
            "id": id,
            "resource": "action/v1",
            "meta": { "name": "Step" },
            "spec": { "source": source }
        })));
    }
    api.insert_component(component(json!({
        "id": "flow-1",
        "resource": "flow/v1",
        "meta": { "name": "Pipeline" },
        "spec": {
            "nodes": {
                "step1": { "component_id": "leaf-a", "inputs": { "x": "{{input.x}}" },
                           "position": { "x": 100, "y": 40 } },
                "step2": { "component_id": "leaf-b", "loop": { "enabled": true, "over": "items" } },
                "step3": { "component_id": "leaf-c" }
            },
            "io_nodes": { "input": { "x": 0, "y": 0 }, "output": { "x": 400, "y": 0 } }
        }
    })));
    api.insert_component(component(json!({
        "id": "leaf-search",
        "resource": "action/v1",
        "meta": { "name": "Search" },
        "spec": { "source": "def search(q):\n    return []\n" }
    })));
    api.insert_component(component(json!({
        "id": "agent-1",
        "resource": "agent/v1",
        "meta": { "name": "Bot" },
        "spec": {
            "model": "gpt-4o",
            "settings": { "temperature": 0.2 },
            "prompts": { "system": ["You are helpful."], "user": [] },
            "nodes": { "tool": { "component_id": "leaf-search", "order": 1 } }
        }
    })));

    let mut reqs = serde_json::Map::new();
    reqs.insert("context".into(), json!("Internal demo"));
    api.set_project_requirements("p1", reqs);
    let mut reqs = serde_json::Map::new();
    reqs.insert("outcomes".into(), json!(["greets the user"]));
    reqs.insert("safety".into(), json!(""));
    api.set_component_requirements("leaf-greet", reqs);

    for (id, name) in [("org-1", "First Org"), ("org-2", "Acme Inc.")] {
        api.add_membership(Membership {
            organization: Organization {
                id: id.into(),
                name: name.into(),
            },
            role: None,
        });
    }
    api
}

/// Relative path → content of every file under `root`, excluding the Sync
/// State (it carries a timestamp).
pub fn snapshot(root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    collect(root, root, &mut out);
    out.remove(".triform/state.json");
    out
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("entry").path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("under root")
                .to_string_lossy()
                .replace('\\', "/");
            out.insert(rel, fs::read_to_string(&path).expect("read file"));
        }
    }
}

/// JSON text with object keys emitted in reverse-sorted order at every level.
pub fn reversed_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.reverse();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}: {}", Value::String(k.clone()), reversed_json(&map[k])))
                .collect();
            format!("{{{}}}", body.join(", "))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(reversed_json).collect();
            format!("[{}]", body.join(", "))
        }
        scalar => scalar.to_string(),
    }
}

pub fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}

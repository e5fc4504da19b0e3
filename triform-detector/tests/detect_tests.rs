//! Parameterised component detection tests for `triform-detector`.
//!
//! Each `#[case]` gets an isolated `TempDir`.

use std::fs;

use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use rstest::rstest;
use tempfile::TempDir;
use triform_core::ComponentKind;
use triform_detector::{discover_components, infer_kind, read_sidecar, FolderListing};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn make_dir() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn touch(dir: &std::path::Path, rel: &str, content: &str) {
    ChildPath::new(dir.join(rel))
        .write_str(content)
        .expect("write fixture");
}

// ---------------------------------------------------------------------------
// Structural inference
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["main.py"], Some(ComponentKind::Leaf))]
#[case(&["tool.py", "settings.json"], Some(ComponentKind::Leaf))]
#[case(&["__init__.py"], None)]
#[case(&["__init__.py", "nodes.json"], Some(ComponentKind::Flow))]
#[case(&["settings.json"], Some(ComponentKind::Agent))]
#[case(&["prompts.json", "nodes.json"], Some(ComponentKind::Agent))]
#[case(&["io_nodes.json", "nodes.json"], Some(ComponentKind::Flow))]
#[case(&["io_nodes.json"], Some(ComponentKind::Flow))]
#[case(&["nodes.json"], Some(ComponentKind::Flow))]
#[case(&["readme.md", "io.json", "requirements.json"], None)]
#[case(&[], None)]
fn infers_kind_from_file_names(#[case] files: &[&str], #[case] expected: Option<ComponentKind>) {
    let listing = FolderListing::from_files(files.iter().copied());
    assert_eq!(infer_kind(&listing), expected);
}

#[rstest]
#[case("main.py", Some(ComponentKind::Leaf))]
#[case("prompts.json", Some(ComponentKind::Agent))]
#[case("io_nodes.json", Some(ComponentKind::Flow))]
#[case("readme.md", None)]
fn detects_kind_on_disk(#[case] file: &str, #[case] expected: Option<ComponentKind>) {
    let dir = make_dir();
    touch(dir.path(), file, "{}");
    let listing = FolderListing::read(dir.path()).expect("list");
    assert_eq!(infer_kind(&listing), expected);
}

#[test]
fn subdirectory_named_like_a_marker_is_not_a_file() {
    let dir = make_dir();
    fs::create_dir(dir.path().join("nodes.json")).expect("mkdir");
    let listing = FolderListing::read(dir.path()).expect("list");
    assert_eq!(infer_kind(&listing), None);
}

// ---------------------------------------------------------------------------
// Source file and sidecar
// ---------------------------------------------------------------------------

#[test]
fn source_file_is_first_by_name() {
    let dir = make_dir();
    touch(dir.path(), "__init__.py", "");
    touch(dir.path(), "zeta.py", "");
    touch(dir.path(), "handler.py", "");
    let listing = FolderListing::read(dir.path()).expect("list");
    assert_eq!(listing.source_file(), Some("handler.py"));
}

#[test]
fn sidecar_accepts_legacy_field_names() {
    let dir = make_dir();
    touch(
        dir.path(),
        "meta.json",
        r#"{"component_id": "c-9", "type": "agent", "node_key": "bot"}"#,
    );
    let sidecar = read_sidecar(dir.path()).expect("read").expect("present");
    assert_eq!(sidecar.id, "c-9");
    assert_eq!(sidecar.kind, Some(ComponentKind::Agent));
    assert_eq!(sidecar.node_key.as_deref(), Some("bot"));
}

#[test]
fn missing_sidecar_is_none_and_broken_sidecar_errors() {
    let dir = make_dir();
    assert!(read_sidecar(dir.path()).expect("read").is_none());
    touch(dir.path(), "meta.json", "{ not json");
    assert!(read_sidecar(dir.path()).is_err());
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[test]
fn discovers_nested_components_in_order() {
    let dir = make_dir();
    let root = dir.path();
    touch(root, "Greet/main.py", "print('hi')");
    touch(root, "Pipeline/nodes.json", "{}");
    touch(root, "Pipeline/Step/step.py", "");
    touch(root, "Pipeline/Step 2/step.py", "");
    touch(root, "Pipeline/notes/todo.txt", "");
    touch(root, "Bot/settings.json", "{}");
    touch(root, "Bot/Search/search.py", "");

    let found = discover_components(root).expect("discover");
    let summary: Vec<_> = found
        .iter()
        .map(|c| (c.relative.as_str(), c.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Bot", ComponentKind::Agent),
            ("Bot/Search", ComponentKind::Leaf),
            ("Greet", ComponentKind::Leaf),
            ("Pipeline", ComponentKind::Flow),
            ("Pipeline/Step", ComponentKind::Leaf),
            ("Pipeline/Step 2", ComponentKind::Leaf),
        ]
    );
}

#[test]
fn discovery_skips_metadata_triggers_and_caches() {
    let dir = make_dir();
    let root = dir.path();
    touch(root, ".triform/state.json", "{}");
    touch(root, "triggers/endpoints.json", "{}");
    touch(root, "__pycache__/x.py", "");
    touch(root, ".venv/lib/site.py", "");
    touch(root, "Greet/main.py", "");

    let found = discover_components(root).expect("discover");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].relative, "Greet");
}

#[test]
fn leaf_folders_are_not_descended() {
    let dir = make_dir();
    let root = dir.path();
    touch(root, "Greet/main.py", "");
    touch(root, "Greet/helpers/util.py", "");

    let found = discover_components(root).expect("discover");
    assert_eq!(found.len(), 1);
}

#[test]
fn sidecar_only_folder_is_a_component() {
    let dir = make_dir();
    let root = dir.path();
    touch(root, "Draft/meta.json", r#"{"id": "c-1", "kind": "agent"}"#);
    touch(root, "Broken/meta.json", "oops");

    let found = discover_components(root).expect("discover");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, ComponentKind::Agent);
    assert_eq!(found[0].sidecar.as_ref().map(|s| s.id.as_str()), Some("c-1"));
}

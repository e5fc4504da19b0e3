//! On-disk layout of a pulled project.
//!
//! ```text
//! <root>/
//!   <project>.env
//!   readme.md
//!   requirements.json
//!   triggers/{endpoints,chat,scheduled}.json
//!   .triform/config.json      (project identity)
//!   .triform/state.json       (sync state)
//!   <Component>/
//!     <name>.py  pip_requirements.txt  readme.md  io.json  requirements.json
//!     nodes.json  io_nodes.json  prompts.json  settings.json  modifiers.json
//!     meta.json               (identity sidecar)
//!     <Child>/ ...
//! ```

use std::path::{Path, PathBuf};

pub const META_DIR: &str = ".triform";
pub const IDENTITY_FILE: &str = "config.json";
pub const STATE_FILE: &str = "state.json";

pub const README: &str = "readme.md";
pub const REQUIREMENTS: &str = "requirements.json";
pub const TRIGGERS_DIR: &str = "triggers";
pub const ENV_EXTENSION: &str = "env";

pub const SOURCE_EXTENSION: &str = "py";
pub const PACKAGE_INIT: &str = "__init__.py";
pub const PIP_REQUIREMENTS: &str = "pip_requirements.txt";
pub const LEGACY_PIP_REQUIREMENTS: &str = "requirements.txt";
pub const IO: &str = "io.json";
pub const NODES: &str = "nodes.json";
pub const IO_NODES: &str = "io_nodes.json";
pub const PROMPTS: &str = "prompts.json";
pub const SETTINGS: &str = "settings.json";
pub const MODIFIERS: &str = "modifiers.json";
pub const SIDECAR: &str = "meta.json";

/// Trigger kinds written under `triggers/`, in write order.
pub const TRIGGER_KINDS: &[&str] = &["endpoints", "chat", "scheduled"];

/// Requirement sections copied between the remote and `requirements.json`,
/// in the order they are written.
pub const REQUIREMENT_KEYS: &[&str] = &[
    "context",
    "userStories",
    "outcomes",
    "guidelines",
    "dependencies",
    "boundaries",
    "safety",
];

/// Key under which the free-text intention is merged into `requirements.json`.
pub const DESCRIPTION_KEY: &str = "description";

/// Fixed-name files watched inside every component folder. Source files
/// (`*.py`) are matched by extension.
pub const COMPONENT_FILES: &[&str] = &[
    README,
    REQUIREMENTS,
    PIP_REQUIREMENTS,
    IO,
    NODES,
    IO_NODES,
    PROMPTS,
    SETTINGS,
    MODIFIERS,
    SIDECAR,
];

/// Folder names never treated as components.
pub const SKIPPED_DIRS: &[&str] = &["__pycache__", "node_modules"];

/// `<root>/.triform/`
pub fn meta_dir(root: &Path) -> PathBuf {
    root.join(META_DIR)
}

/// `<root>/.triform/config.json`
pub fn identity_path(root: &Path) -> PathBuf {
    meta_dir(root).join(IDENTITY_FILE)
}

/// `<root>/.triform/state.json`
pub fn state_path(root: &Path) -> PathBuf {
    meta_dir(root).join(STATE_FILE)
}

/// Whether a directory entry name is excluded from component discovery.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Root-relative path with `/` separators, as stored in the sync state.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

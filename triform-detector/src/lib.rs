//! Component detection for `triform-detector`.
//!
//! A local folder carries no mandatory type tag. [`infer_kind`] decides what a
//! folder holds from which files are present, checked in priority order:
//!
//! 1. a source file (`*.py`, not `__init__.py`) ⇒ Leaf
//! 2. `settings.json` or `prompts.json` ⇒ Agent
//! 3. `io_nodes.json` ⇒ Flow
//! 4. `nodes.json` alone ⇒ Flow
//!
//! Anything else is not a component. An identity sidecar (`meta.json`) with an
//! explicit kind overrides the checklist.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use triform_core::{layout, ComponentKind, ComponentSidecar};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Names of the regular files and sub-directories directly inside a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    pub files: BTreeSet<String>,
    pub dirs: BTreeSet<String>,
}

/// A folder recognized as a component during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredComponent {
    pub dir: PathBuf,
    /// Root-relative path with `/` separators.
    pub relative: String,
    pub kind: ComponentKind,
    pub sidecar: Option<ComponentSidecar>,
}

/// Errors from component detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DetectError {
    DetectError::Io {
        path: path.into(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

impl FolderListing {
    /// Read the direct entries of `dir`. Symlinks are followed.
    pub fn read(dir: &Path) -> Result<Self, DetectError> {
        let mut listing = FolderListing::default();
        for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let entry = entry.map_err(|e| io_err(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if path.is_dir() {
                listing.dirs.insert(name);
            } else if path.is_file() {
                listing.files.insert(name);
            }
        }
        Ok(listing)
    }

    /// Listing built from file names only.
    pub fn from_files<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FolderListing {
            files: names.into_iter().map(Into::into).collect(),
            dirs: BTreeSet::new(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    /// First source file by name, excluding package markers.
    pub fn source_file(&self) -> Option<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .find(|name| is_source_file(name))
    }
}

fn is_source_file(name: &str) -> bool {
    name != layout::PACKAGE_INIT
        && Path::new(name).extension().and_then(|e| e.to_str()) == Some(layout::SOURCE_EXTENSION)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Structural kind of a folder, or `None` if it is not a component.
pub fn infer_kind(listing: &FolderListing) -> Option<ComponentKind> {
    if listing.source_file().is_some() {
        return Some(ComponentKind::Leaf);
    }
    if listing.has(layout::SETTINGS) || listing.has(layout::PROMPTS) {
        return Some(ComponentKind::Agent);
    }
    if listing.has(layout::IO_NODES) {
        return Some(ComponentKind::Flow);
    }
    if listing.has(layout::NODES) {
        return Some(ComponentKind::Flow);
    }
    None
}

/// Sidecar kind when declared, structural inference otherwise.
pub fn resolve_kind(
    listing: &FolderListing,
    sidecar: Option<&ComponentSidecar>,
) -> Option<ComponentKind> {
    sidecar
        .and_then(|s| s.kind)
        .or_else(|| infer_kind(listing))
}

/// Read the identity sidecar of `dir`.
///
/// `Ok(None)` when absent; [`DetectError::ParseError`] when present but
/// unreadable as a sidecar.
pub fn read_sidecar(dir: &Path) -> Result<Option<ComponentSidecar>, DetectError> {
    let path = dir.join(layout::SIDECAR);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| DetectError::ParseError {
            path,
            message: e.to_string(),
        })
}

/// Walk `root` and return every component folder, parents before children,
/// siblings in name order.
///
/// Dotted folders, caches and the root-level `triggers/` folder are skipped.
/// Only composite folders are descended into. An unreadable sidecar is
/// treated as absent.
pub fn discover_components(root: &Path) -> Result<Vec<DiscoveredComponent>, DetectError> {
    let mut found = Vec::new();
    walk(root, root, true, &mut found)?;
    Ok(found)
}

fn walk(
    root: &Path,
    dir: &Path,
    at_root: bool,
    found: &mut Vec<DiscoveredComponent>,
) -> Result<(), DetectError> {
    let listing = FolderListing::read(dir)?;
    for name in &listing.dirs {
        if layout::is_skipped_dir(name) || (at_root && name == layout::TRIGGERS_DIR) {
            continue;
        }
        let child = dir.join(name);
        let child_listing = FolderListing::read(&child)?;
        let sidecar = match read_sidecar(&child) {
            Ok(sidecar) => sidecar,
            Err(err) => {
                tracing::warn!("ignoring identity sidecar: {err}");
                None
            }
        };
        let Some(kind) = resolve_kind(&child_listing, sidecar.as_ref()) else {
            continue;
        };
        found.push(DiscoveredComponent {
            dir: child.clone(),
            relative: layout::relative_key(root, &child),
            kind,
            sidecar,
        });
        if kind.is_composite() {
            walk(root, &child, false, found)?;
        }
    }
    Ok(())
}

//! Tracked-file scanner.
//!
//! The tracked set is rebuilt on every poll so files created after start-up
//! are picked up. A change is any difference between two snapshots: a new
//! path, a removed path, or a different modification time.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use triform_core::layout;
use triform_detector::{discover_components, FolderListing};

use crate::error::{io_err, WatchError};

pub type Snapshot = HashMap<PathBuf, SystemTime>;

/// Every file whose modification should trigger a push, in no particular
/// order.
pub fn tracked_files(root: &Path) -> Result<Vec<PathBuf>, WatchError> {
    let mut files = Vec::new();

    let top = FolderListing::read(root)?;
    for name in &top.files {
        let is_env = Path::new(name)
            .extension()
            .is_some_and(|ext| ext == layout::ENV_EXTENSION);
        if is_env || name == layout::README || name == layout::REQUIREMENTS {
            files.push(root.join(name));
        }
    }

    let triggers = root.join(layout::TRIGGERS_DIR);
    if triggers.is_dir() {
        for name in FolderListing::read(&triggers)?.files {
            if name.ends_with(".json") {
                files.push(triggers.join(name));
            }
        }
    }

    for found in discover_components(root)? {
        let listing = FolderListing::read(&found.dir)?;
        for name in &listing.files {
            let is_source = Path::new(name)
                .extension()
                .is_some_and(|ext| ext == layout::SOURCE_EXTENSION);
            if is_source || layout::COMPONENT_FILES.contains(&name.as_str()) {
                files.push(found.dir.join(name));
            }
        }
    }
    Ok(files)
}

/// Modification time of every tracked file. Files that vanish between
/// listing and stat are left out.
pub fn snapshot(root: &Path) -> Result<Snapshot, WatchError> {
    let mut out = Snapshot::new();
    for path in tracked_files(root)? {
        match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => {
                out.insert(path, modified);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&path, err)),
        }
    }
    Ok(out)
}

/// Last-seen modification times for one project root.
#[derive(Debug)]
pub struct ChangeTracker {
    root: PathBuf,
    seen: Snapshot,
}

impl ChangeTracker {
    /// Record the current state of `root` as the baseline.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let root = root.into();
        let seen = snapshot(&root)?;
        Ok(ChangeTracker { root, seen })
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    /// Rescan and report whether anything differs from the previous scan.
    pub fn poll(&mut self) -> Result<bool, WatchError> {
        let current = snapshot(&self.root)?;
        let changed = current != self.seen;
        if changed {
            for path in current.keys().filter(|p| !self.seen.contains_key(*p)) {
                tracing::debug!(path = %path.display(), "new tracked file");
            }
            for path in self.seen.keys().filter(|p| !current.contains_key(*p)) {
                tracing::debug!(path = %path.display(), "tracked file removed");
            }
        }
        self.seen = current;
        Ok(changed)
    }
}

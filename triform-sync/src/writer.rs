//! Hash-gated atomic file writer.
//!
//! ## `write_if_changed` protocol
//!
//! 1. Normalize line endings to LF.
//! 2. SHA-256 the new content and the current on-disk content.
//! 3. Equal digests ⇒ skip, leaving the modification time untouched.
//! 4. Write to `<path>.triform.tmp`.
//! 5. Rename to the final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::checksum::content_digest;
use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written,
    /// File was skipped; on-disk content already matches.
    Unchanged,
}

impl WriteResult {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteResult::Written)
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write `content` to `path` unless the file already holds the same content.
pub fn write_if_changed(path: &Path, content: &str) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.triform.tmp", path.display()));
    write_with_tmp(path, content, &tmp)
}

/// Pretty-printed JSON variant of [`write_if_changed`].
pub fn write_json_if_changed<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<WriteResult, SyncError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_if_changed(path, &json)
}

fn write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<WriteResult, SyncError> {
    let normalized = content.replace("\r\n", "\n");
    let content = normalized.as_str();

    if let Some(existing) = read_existing(path)? {
        if content_digest(&existing) == content_digest(content) {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged);
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written)
}

fn read_existing(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        // Non-UTF-8 content is simply replaced.
        Err(err) if err.kind() == ErrorKind::InvalidData => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

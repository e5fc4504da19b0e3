//! Error types for triform-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use triform_api::ApiError;
use triform_core::CoreError;
use triform_detector::DetectError;
use triform_renderer::RenderError;

/// Fatal errors from pull, push and diff.
///
/// Per-folder problems during push are collected as [`PushFailure`]s instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote project does not exist.
    #[error("project {id} not found")]
    NotFound { id: String },

    /// The directory has no `.triform/config.json`.
    #[error(
        "{path} is not a Triform project directory (run `triform projects pull <id>` first)"
    )]
    NotAProject { path: PathBuf },

    /// A remote call failed; carries the operation and message.
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// A structured local file is present but cannot be used.
    #[error("invalid content in {path}: {message}")]
    InvalidLocalContent { path: PathBuf, message: String },

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("detection error: {0}")]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Core(CoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotAProject { path } => SyncError::NotAProject { path },
            CoreError::Io { path, source } => SyncError::Io { path, source },
            other => SyncError::Core(other),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// A push step that failed without stopping the rest of the push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    /// Root-relative folder path, or a project-level label.
    pub target: String,
    pub message: String,
}

impl PushFailure {
    pub(crate) fn new(target: impl Into<String>, message: impl fmt::Display) -> Self {
        PushFailure {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for PushFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.message)
    }
}

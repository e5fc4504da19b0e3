use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the change watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a Triform project directory: {path}")]
    NotAProject { path: PathBuf },

    #[error("detect error: {0}")]
    Detect(#[from] triform_detector::DetectError),

    #[error("sync error: {0}")]
    Sync(#[from] triform_sync::SyncError),

    #[error("push task join failure: {0}")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatchError {
    WatchError::Io {
        path: path.into(),
        source,
    }
}

//! # triform-sync
//!
//! Bidirectional transcoding between a remote Triform project and a local
//! directory tree.
//!
//! - [`pull_project`] writes the tree and a fresh Sync State.
//! - [`push_project`] reads the tree back, diffs checksums against the Sync
//!   State and sends only what changed.
//! - [`diff_project`] reports local changes without contacting the remote.

pub mod checksum;
pub mod diff;
pub mod error;
pub mod local;
pub mod naming;
pub mod pull;
pub mod push;
pub mod state_store;
pub mod writer;

pub use checksum::{checksum_json, checksum_text};
pub use diff::{diff_project, DiffReport, LocalChange, LocalStatus};
pub use error::{PushFailure, SyncError};
pub use pull::{pull_project, PullOptions, PullReport};
pub use push::{push_project, PushOptions, PushReport};
pub use state_store::{StateEntry, SyncState};
pub use writer::WriteResult;

//! Change watcher: polls a pulled project for local edits and pushes them.

mod debounce;
mod error;
mod runtime;
pub mod tracker;

pub use debounce::Debouncer;
pub use error::WatchError;
pub use runtime::{init_tracing, run, start_blocking, WatchConfig, WatchSummary, ENV_LOG_FORMAT};
pub use tracker::ChangeTracker;

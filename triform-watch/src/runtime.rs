use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use triform_core::{identity, Settings};
use triform_sync::{PushReport, SyncError};

use crate::debounce::Debouncer;
use crate::error::{io_err, WatchError};
use crate::tracker::ChangeTracker;

/// Set to `json` to emit log records as JSON lines.
pub const ENV_LOG_FORMAT: &str = "TRIFORM_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig::from_settings(&Settings::default())
    }
}

impl WatchConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        WatchConfig {
            poll_interval: settings.poll_interval(),
            debounce: settings.debounce(),
        }
    }
}

/// Totals reported when the watcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    /// Push cycles started.
    pub pushes: usize,
    /// Cycles that failed outright or reported per-folder errors.
    pub failures: usize,
}

/// Watch `root` until ctrl-c, blocking the current thread.
pub fn start_blocking<F>(
    root: &Path,
    config: WatchConfig,
    push: F,
) -> Result<WatchSummary, WatchError>
where
    F: Fn(&Path) -> Result<PushReport, SyncError> + Send + Sync + 'static,
{
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(root.to_path_buf(), config, push, ctrl_c()))
}

/// Poll `root` every `config.poll_interval` and call `push` for detected
/// changes until `shutdown` resolves.
///
/// `shutdown` is only observed between polls, so a push that has started
/// always runs to completion.
pub async fn run<F, S>(
    root: PathBuf,
    config: WatchConfig,
    push: F,
    shutdown: S,
) -> Result<WatchSummary, WatchError>
where
    F: Fn(&Path) -> Result<PushReport, SyncError> + Send + Sync + 'static,
    S: Future<Output = ()>,
{
    if !identity::exists_at(&root) {
        return Err(WatchError::NotAProject { path: root });
    }

    let push = Arc::new(push);
    let mut tracker = ChangeTracker::new(&root)?;
    let mut debouncer = Debouncer::new(config.debounce);
    let mut summary = WatchSummary::default();

    tracing::info!(
        root = %root.display(),
        tracked = tracker.tracked(),
        poll_ms = config.poll_interval.as_millis() as u64,
        debounce_ms = config.debounce.as_millis() as u64,
        "watching for changes",
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }

        match tracker.poll() {
            Ok(true) => debouncer.mark(),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "scan of tracked files failed"),
        }

        let now = Instant::now();
        if !debouncer.ready(now) {
            continue;
        }
        debouncer.record_push(now);
        summary.pushes += 1;

        tracing::info!("change detected, pushing");
        let job = {
            let push = push.clone();
            let root = root.clone();
            tokio::task::spawn_blocking(move || push(&root))
        };
        let outcome = job.await.map_err(|err| WatchError::Join(err.to_string()))?;

        match outcome {
            Ok(report) => {
                for failure in &report.errors {
                    tracing::warn!(target_path = %failure.target, error = %failure.message, "push error");
                }
                if report.has_errors() {
                    summary.failures += 1;
                }
                tracing::info!(
                    updated = report.updated.len(),
                    created = report.created.len(),
                    unchanged = report.unchanged.len(),
                    errors = report.errors.len(),
                    duration_ms = now.elapsed().as_millis() as u64,
                    "push completed",
                );
                // Creation writes sidecars; do not treat them as a user edit.
                if !report.created.is_empty() {
                    if let Err(err) = tracker.poll() {
                        tracing::warn!(error = %err, "rescan after push failed");
                    }
                }
            }
            Err(err) => {
                summary.failures += 1;
                tracing::error!(error = %err, "push failed");
            }
        }
    }

    tracing::info!(
        pushes = summary.pushes,
        failures = summary.failures,
        "watcher stopped"
    );
    Ok(summary)
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, stopping watcher"),
        Err(err) => {
            tracing::warn!(error = %err, "ctrl-c handler failed; watching until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Install the `fmt` subscriber on stderr (default filter `info`, `RUST_LOG`
/// overrides). Records from crates logging through the `log` facade are
/// forwarded.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

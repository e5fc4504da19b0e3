pub mod component;
pub mod diff;
pub mod executions;
pub mod projects;
pub mod pull;
pub mod push;
pub mod status;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};

use triform_api::HttpApi;
use triform_core::{settings, Settings};

/// User settings with environment overrides applied.
pub fn load_settings() -> Result<Settings> {
    settings::load().context("failed to load ~/.triform/config.yaml")
}

/// HTTP client for the configured endpoint.
pub fn remote(settings: &Settings) -> HttpApi {
    HttpApi::from_settings(settings)
}

/// `--dir`, else the current directory.
pub fn project_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}

/// First eight characters of an id, for table columns.
pub fn short_id(id: &str) -> String {
    if id.chars().count() > 8 {
        format!("{}...", id.chars().take(8).collect::<String>())
    } else {
        id.to_string()
    }
}

/// `text` cut to `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

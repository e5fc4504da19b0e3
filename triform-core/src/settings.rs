//! User settings: `~/.triform/config.yaml`.
//!
//! # API pattern
//!
//! - `load_at(home)` / `save_at(home, …)`: explicit home, used in tests
//! - `load()` derives home from `dirs::home_dir()` and applies environment
//!   overrides
//!
//! The session token is never persisted here; it is read from `TRIFORM_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

pub const DEFAULT_API_URL: &str = "https://app.triform.ai/api";
pub const ENV_API_URL: &str = "TRIFORM_API_URL";
pub const ENV_WORKSPACE: &str = "TRIFORM_WORKSPACE";
pub const ENV_TOKEN: &str = "TRIFORM_TOKEN";

/// Directory name used under the current directory when no workspace root is set.
pub const DEFAULT_WORKSPACE_DIR: &str = "Triform";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    /// Parent of `<org>/<project>` folders created by pull.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            workspace_root: None,
            poll_interval_ms: 500,
            debounce_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Workspace root, falling back to `<cwd>/Triform`.
    pub fn workspace_root_or(&self, cwd: &Path) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_WORKSPACE_DIR))
    }

    /// Apply `TRIFORM_API_URL` / `TRIFORM_WORKSPACE` overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(root) = lookup(ENV_WORKSPACE).filter(|v| !v.trim().is_empty()) {
            self.workspace_root = Some(PathBuf::from(root));
        }
        self
    }
}

/// `<home>/.triform/config.yaml`
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".triform").join("config.yaml")
}

/// Load settings from `home`; a missing file yields defaults.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| CoreError::Parse { path, source })
}

/// Save settings atomically.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), CoreError> {
    let path = settings_path_at(home);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let yaml = serde_yaml::to_string(settings)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load settings for the current user with environment overrides applied.
pub fn load() -> Result<Settings, CoreError> {
    let home = dirs::home_dir().ok_or(CoreError::HomeNotFound)?;
    Ok(load_at(&home)?.with_overrides(|key| std::env::var(key).ok()))
}

/// Session token from `TRIFORM_TOKEN`, if set.
pub fn token_from_env() -> Option<String> {
    std::env::var(ENV_TOKEN)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

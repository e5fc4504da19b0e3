//! Project identity file: `<root>/.triform/config.json`.
//!
//! Written by pull, required by push and watch. Saves use the atomic
//! `.tmp` + rename pattern.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::layout;

/// Which remote project a local directory tree mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdentity {
    #[serde(alias = "project_id")]
    pub project_id: String,
    #[serde(alias = "project_name")]
    pub project_name: String,
    #[serde(default, alias = "organization_id", skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, alias = "organization_name", skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
}

/// Whether `root` looks like a pulled project.
pub fn exists_at(root: &Path) -> bool {
    layout::identity_path(root).is_file()
}

/// Load the identity of the project rooted at `root`.
///
/// Returns [`CoreError::NotAProject`] when the file is absent.
pub fn load_at(root: &Path) -> Result<ProjectIdentity, CoreError> {
    let path = layout::identity_path(root);
    if !path.exists() {
        return Err(CoreError::NotAProject {
            path: root.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|source| CoreError::Json { path, source })
}

/// Save the identity atomically, creating `.triform/` if needed.
pub fn save_at(root: &Path, identity: &ProjectIdentity) -> Result<(), CoreError> {
    let path = layout::identity_path(root);
    let dir = layout::meta_dir(root);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let json = serde_json::to_string_pretty(identity).map_err(|source| CoreError::Json {
        path: path.clone(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ProjectIdentity {
        ProjectIdentity {
            project_id: "p-1".into(),
            project_name: "Demo".into(),
            organization_id: Some("org-1".into()),
            organization_name: Some("Acme".into()),
        }
    }

    #[test]
    fn missing_identity_is_not_a_project() {
        let tmp = TempDir::new().unwrap();
        let err = load_at(tmp.path()).unwrap_err();
        assert!(matches!(err, CoreError::NotAProject { .. }));
        assert!(!exists_at(tmp.path()));
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &sample()).unwrap();
        assert!(exists_at(tmp.path()));
        assert_eq!(load_at(tmp.path()).unwrap(), sample());
        let tmp_path = layout::identity_path(tmp.path()).with_extension("json.tmp");
        assert!(!tmp_path.exists(), "tmp file should be renamed away");
    }

    #[test]
    fn reads_snake_case_identity() {
        let tmp = TempDir::new().unwrap();
        let dir = layout::meta_dir(tmp.path());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            layout::identity_path(tmp.path()),
            r#"{"project_id":"p-2","project_name":"Old","organization_name":"default"}"#,
        )
        .unwrap();

        let identity = load_at(tmp.path()).unwrap();
        assert_eq!(identity.project_id, "p-2");
        assert_eq!(identity.organization_id, None);
        assert_eq!(identity.organization_name.as_deref(), Some("default"));
    }

    #[test]
    fn malformed_identity_reports_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(layout::meta_dir(tmp.path())).unwrap();
        std::fs::write(layout::identity_path(tmp.path()), "{not json").unwrap();
        let err = load_at(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }
}

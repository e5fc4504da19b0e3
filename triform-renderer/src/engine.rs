//! Tera rendering engine: [`Artifact`] and [`Renderer`].
//!
//! | Artifact | Template          | Written to                |
//! |----------|-------------------|---------------------------|
//! | EnvFile  | `env.tera`        | `<root>/<project>.env`    |
//! | Readme   | `readme.md.tera`  | `readme.md` (when blank)  |
//!
//! Files named the same under `~/.triform/templates/` override the embedded
//! defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use triform_core::Environment;

use crate::context::{EnvFileContext, ReadmeContext};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("env.tera", include_str!("templates/env.tera")),
    ("readme.md.tera", include_str!("templates/readme.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (normalize_template_name(Path::new(name)), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

/// `<home>/.triform/templates/`
pub fn templates_dir_at(home: &Path) -> PathBuf {
    home.join(".triform").join("templates")
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Textual artifacts produced from templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    EnvFile,
    Readme,
}

impl Artifact {
    pub fn all() -> &'static [Artifact] {
        &[Artifact::EnvFile, Artifact::Readme]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Artifact::EnvFile => "env.tera",
            Artifact::Readme => "readme.md.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine over the embedded templates plus optional user overrides.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }

    pub fn render(&self, artifact: Artifact, ctx: &Context) -> Result<String, RenderError> {
        Ok(self.tera.render(artifact.template_name(), ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Typed entry points over [`TemplateEngine`]. Create once and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Renderer with embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(None)?,
        })
    }

    /// Renderer whose templates may be overridden from `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(Some(dir))?,
        })
    }

    /// Environment file: header, then `# Variables` and
    /// `# Secrets (fill in actual values)` sections when non-empty.
    pub fn render_env_file(&self, environment: &Environment) -> Result<String, RenderError> {
        let ctx = EnvFileContext::from_environment(environment).to_tera_context()?;
        self.engine.render(Artifact::EnvFile, &ctx)
    }

    /// Default documentation header for a component or project named `name`.
    pub fn render_readme(&self, name: &str) -> Result<String, RenderError> {
        let ctx = ReadmeContext::new(name).to_tera_context()?;
        self.engine.render(Artifact::Readme, &ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use triform_core::EnvVar;

    #[test]
    fn every_artifact_has_an_embedded_template() {
        let engine = TemplateEngine::new(None).unwrap();
        for artifact in Artifact::all() {
            let name = artifact.template_name();
            assert!(
                engine.tera.get_template_names().any(|n| n == name),
                "missing template {name}"
            );
        }
    }

    #[test]
    fn empty_environment_renders_header_only() {
        let renderer = Renderer::new().unwrap();
        let out = renderer.render_env_file(&Environment::default()).unwrap();
        assert_eq!(out, "# Environment variables for Triform project\n");
    }

    #[test]
    fn secrets_only_section() {
        let renderer = Renderer::new().unwrap();
        let env = Environment {
            variables: vec![EnvVar {
                key: "API_KEY".into(),
                value: String::new(),
                secret: true,
            }],
        };
        let out = renderer.render_env_file(&env).unwrap();
        assert_eq!(
            out,
            "# Environment variables for Triform project\n\n\
             # Secrets (fill in actual values)\n\
             API_KEY=# Add your secret here\n"
        );
    }

    #[test]
    fn values_are_not_html_escaped() {
        let renderer = Renderer::new().unwrap();
        let env = Environment {
            variables: vec![EnvVar {
                key: "URL".into(),
                value: "https://x.io/?a=1&b=<2>".into(),
                secret: false,
            }],
        };
        let out = renderer.render_env_file(&env).unwrap();
        assert!(out.contains("URL=https://x.io/?a=1&b=<2>\n"), "got: {out}");
    }
}

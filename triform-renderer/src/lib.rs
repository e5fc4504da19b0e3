//! # triform-renderer
//!
//! Tera templates for the textual project artifacts written by pull: the
//! environment file and the default documentation header.
//!
//! ```rust,no_run
//! use triform_renderer::Renderer;
//! use triform_core::Environment;
//!
//! fn env_file(environment: &Environment) -> Option<String> {
//!     Renderer::new().ok()?.render_env_file(environment).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{EnvFileContext, EnvLine, ReadmeContext};
pub use engine::{templates_dir_at, Artifact, Renderer, TemplateEngine};
pub use error::RenderError;

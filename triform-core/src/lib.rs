//! Triform core library with domain types, local layout, project identity and settings.
//!
//! - [`types`]: component tree, project record, identity sidecar
//! - [`layout`]: on-disk file names shared by pull, push and watch
//! - [`identity`]: `.triform/config.json` load / save
//! - [`settings`]: `~/.triform/config.yaml` user settings
//! - [`error`]: [`CoreError`]

pub mod error;
pub mod identity;
pub mod layout;
pub mod settings;
pub mod types;

pub use error::CoreError;
pub use identity::ProjectIdentity;
pub use settings::Settings;
pub use types::{
    AgentSpec, ChildRef, Component, ComponentKind, ComponentMeta, ComponentSidecar, EnvVar,
    Environment, FlowSpec, LeafSpec, Payload, Project, ProjectMeta, ProjectSpec,
};

//! Triform: sync Triform projects between the remote service and local files.
//!
//! # Usage
//!
//! ```text
//! triform projects list
//! triform projects pull <project-id> [--dir <path>]
//! triform projects push [--dir <path>] [--force] [--create]
//! triform projects watch [--dir <path>]
//! triform projects status [--dir <path>] [--json]
//! triform diff [--dir <path>] [--json]
//! triform component get <component-id> [--depth <n>]
//! triform executions [--limit <n>]
//! ```
//!
//! The endpoint comes from `~/.triform/config.yaml` or `TRIFORM_API_URL`; the
//! session token from `TRIFORM_TOKEN`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    component::ComponentCommand, diff::DiffArgs, executions::ExecutionsArgs,
    projects::ProjectsCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "triform",
    version,
    about = "Sync Triform projects with a local directory tree",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull, push, watch and inspect projects.
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },

    /// Show local changes since the last pull or push.
    Diff(DiffArgs),

    /// Inspect remote components.
    Component {
        #[command(subcommand)]
        command: ComponentCommand,
    },

    /// List recent executions.
    Executions(ExecutionsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Projects { command } => commands::projects::run(command),
        Commands::Diff(args) => args.run(),
        Commands::Component { command } => commands::component::run(command),
        Commands::Executions(args) => args.run(),
    }
}

//! `triform projects ...`

use anyhow::{Context, Result};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use triform_api::RemoteApi;

use super::pull::PullArgs;
use super::push::PushArgs;
use super::status::StatusArgs;
use super::watch::WatchArgs;
use super::{load_settings, remote, short_id, truncate};

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List projects visible to the current session.
    List,
    /// Pull a project into a local directory tree.
    Pull(PullArgs),
    /// Push local changes to the remote project.
    Push(PushArgs),
    /// Watch a pulled project and push changes as they happen.
    Watch(WatchArgs),
    /// Show the identity and sync state of a pulled project.
    Status(StatusArgs),
}

pub fn run(command: ProjectsCommand) -> Result<()> {
    match command {
        ProjectsCommand::List => list(),
        ProjectsCommand::Pull(args) => args.run(),
        ProjectsCommand::Push(args) => args.run(),
        ProjectsCommand::Watch(args) => args.run(),
        ProjectsCommand::Status(args) => args.run(),
    }
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "description")]
    description: String,
}

fn list() -> Result<()> {
    let settings = load_settings()?;
    let api = remote(&settings);
    let projects = api.list_projects().context("failed to list projects")?;

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| ProjectRow {
            id: short_id(&p.id),
            name: p.meta.name.clone(),
            description: truncate(&p.meta.intention, 50),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

//! `triform component get <id>`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use triform_api::RemoteApi;

use super::{load_settings, remote};

#[derive(Subcommand, Debug)]
pub enum ComponentCommand {
    /// Print a component record as JSON.
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Remote component id.
    pub component_id: String,

    /// How many levels of embedded children to resolve.
    #[arg(long, short = 'd', default_value_t = 0)]
    pub depth: u32,
}

pub fn run(command: ComponentCommand) -> Result<()> {
    match command {
        ComponentCommand::Get(args) => get(args),
    }
}

fn get(args: GetArgs) -> Result<()> {
    let settings = load_settings()?;
    let api = remote(&settings);
    let component = api
        .get_component(&args.component_id, args.depth)
        .with_context(|| format!("failed to fetch component '{}'", args.component_id))?
        .with_context(|| format!("component '{}' not found", args.component_id))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&component).context("failed to serialize component")?
    );
    Ok(())
}

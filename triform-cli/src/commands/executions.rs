//! `triform executions`: recent execution history.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use triform_api::{Execution, RemoteApi};

use super::{load_settings, remote, short_id, truncate};

#[derive(Args, Debug)]
pub struct ExecutionsArgs {
    /// Number of executions to show.
    #[arg(long, short = 'l', default_value_t = 20)]
    pub limit: usize,
}

#[derive(Tabled)]
struct ExecutionRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "created")]
    created: String,
}

impl ExecutionsArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let api = remote(&settings);
        let executions = api
            .list_executions(self.limit)
            .context("failed to list executions")?;

        if executions.is_empty() {
            println!("No executions found.");
            return Ok(());
        }

        let rows: Vec<ExecutionRow> = executions.iter().map(row).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn row(execution: &Execution) -> ExecutionRow {
    let state = execution.state.as_deref().unwrap_or("unknown");
    let state = match state {
        "completed" => state.green().to_string(),
        "failed" => state.red().to_string(),
        "running" => state.yellow().to_string(),
        "pending" => state.bright_black().to_string(),
        other => other.to_string(),
    };
    ExecutionRow {
        id: short_id(&execution.id),
        state,
        source: execution.source.clone().unwrap_or_default(),
        created: truncate(execution.created_at.as_deref().unwrap_or_default(), 19),
    }
}

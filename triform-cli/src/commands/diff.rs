//! `triform diff`: local changes since the last pull or push.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use triform_sync::{diff_project, LocalStatus};

use super::project_dir;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project directory. Defaults to the current directory.
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "component")]
    component: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "status")]
    status: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let root = project_dir(self.dir)?;
        let report = diff_project(&root)
            .with_context(|| format!("diff failed for {}", root.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize diff JSON")?
            );
            return Ok(());
        }

        if report.is_clean() {
            println!("{} No changes detected", "✓".green());
            return Ok(());
        }

        let rows: Vec<ChangeRow> = report
            .pending()
            .map(|change| ChangeRow {
                component: change
                    .key
                    .clone()
                    .unwrap_or_else(|| change.directory.clone()),
                kind: change.kind.to_string(),
                status: colored_status(change.status),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "{} modified, {} deleted, {} new",
            report.count(LocalStatus::Modified),
            report.count(LocalStatus::Deleted),
            report.count(LocalStatus::New)
        );
        Ok(())
    }
}

fn colored_status(status: LocalStatus) -> String {
    match status {
        LocalStatus::Modified => status.as_str().yellow().to_string(),
        LocalStatus::Deleted => status.as_str().red().to_string(),
        LocalStatus::New => status.as_str().green().to_string(),
        LocalStatus::Unchanged => status.as_str().to_string(),
    }
}

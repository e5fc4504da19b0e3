//! `triform projects pull <id>`: materialize a remote project on disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use triform_renderer::templates_dir_at;
use triform_sync::{pull_project, PullOptions, PullReport};

use super::{load_settings, remote};

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Remote project id.
    pub project_id: String,

    /// Target directory. Defaults to `<workspace>/<organization>/<project>`.
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        triform_watch::init_tracing();
        let settings = load_settings()?;
        let api = remote(&settings);
        let cwd = std::env::current_dir().context("could not determine current directory")?;

        let templates_dir = dirs::home_dir()
            .map(|home| templates_dir_at(&home))
            .filter(|dir| dir.is_dir());
        let options = PullOptions {
            target_dir: self.dir,
            workspace_root: settings.workspace_root_or(&cwd),
            templates_dir,
        };

        let report = pull_project(&api, &self.project_id, &options)
            .with_context(|| format!("pull failed for project '{}'", self.project_id))?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &PullReport) {
    println!(
        "{} Project '{}' pulled to {}",
        "✓".green(),
        report.project_name,
        report.root.display()
    );
    println!(
        "  {} components ({} top-level), {} files written, {} unchanged",
        report.state.components.len(),
        report.top_level,
        report.files_written,
        report.files_unchanged
    );
    for key in &report.skipped {
        println!("  {} skipped node '{key}' (component unavailable)", "!".yellow());
    }
}

//! `triform projects push`: send local changes to the remote project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use triform_sync::{push_project, PushOptions, PushReport};

use super::{load_settings, project_dir, remote};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Project directory. Defaults to the current directory.
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Update every component even when its checksum is unchanged.
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Create remote components for folders that have no identity yet.
    #[arg(long)]
    pub create: bool,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        triform_watch::init_tracing();
        let root = project_dir(self.dir)?;
        let settings = load_settings()?;
        let api = remote(&settings);

        let options = PushOptions {
            force: self.force,
            create: self.create,
        };
        let report = push_project(&api, &root, options)
            .with_context(|| format!("push failed for {}", root.display()))?;
        print_report(&report);
        Ok(())
    }
}

pub fn print_report(report: &PushReport) {
    for rel in &report.updated {
        println!("  {} {rel}", "✎".green());
    }
    for rel in &report.created {
        println!("  {} {rel}", "+".green());
    }
    for rel in &report.pending_new {
        println!("  {} {rel} (new, use --create to push)", "?".cyan());
    }
    for rel in &report.stale {
        println!(
            "  {} {rel} (stale copy, component is tracked in another folder)",
            "!".yellow()
        );
    }
    for failure in &report.errors {
        println!("  {} {failure}", "✗".red());
    }

    println!(
        "{} updated, {} created, {} unchanged, {} new",
        report.updated.len(),
        report.created.len(),
        report.unchanged.len(),
        report.pending_new.len()
    );
    if report.has_errors() {
        println!(
            "{} Completed with {} errors",
            "⚠".yellow(),
            report.errors.len()
        );
    } else {
        println!("{} Push complete", "✓".green());
    }
}

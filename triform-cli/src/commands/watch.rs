//! `triform projects watch`: poll for local edits and push them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use triform_sync::{push_project, PushOptions};
use triform_watch::{start_blocking, WatchConfig};

use super::{load_settings, project_dir, remote};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project directory. Defaults to the current directory.
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let root = project_dir(self.dir)?;
        let settings = load_settings()?;
        let api = remote(&settings);
        let config = WatchConfig::from_settings(&settings);

        println!("Watching {} (Ctrl+C to stop)", root.display());
        let summary = start_blocking(&root, config, move |root| {
            push_project(&api, root, PushOptions::default())
        })
        .context("watcher exited with error")?;
        println!(
            "Stopped after {} pushes ({} with errors)",
            summary.pushes, summary.failures
        );
        Ok(())
    }
}

//! `triform projects status`: identity and Sync State of a pulled project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use triform_core::{identity, ProjectIdentity};
use triform_sync::{state_store, SyncState};

use super::{project_dir, truncate};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Project directory. Defaults to the current directory.
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let root = project_dir(self.dir)?;
        let identity = identity::load_at(&root)
            .with_context(|| format!("{} is not a pulled project", root.display()))?;
        let state = state_store::load_at(&root).context("failed to read sync state")?;

        if self.json {
            return print_json(&identity, &state);
        }
        print_table(&identity, &state);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusJson<'a> {
    project_id: &'a str,
    project_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<&'a str>,
    last_sync_timestamp: Option<DateTime<Utc>>,
    components: Vec<ComponentJson<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComponentJson<'a> {
    key: &'a str,
    kind: &'static str,
    directory: &'a str,
    remote_id: &'a str,
    checksum: &'a str,
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "node key")]
    key: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "directory")]
    directory: String,
}

fn print_json(identity: &ProjectIdentity, state: &SyncState) -> Result<()> {
    let payload = StatusJson {
        project_id: &identity.project_id,
        project_name: &identity.project_name,
        organization: identity.organization_name.as_deref(),
        last_sync_timestamp: state.last_sync_timestamp,
        components: state
            .components
            .iter()
            .map(|(key, entry)| ComponentJson {
                key,
                kind: entry.kind.as_str(),
                directory: &entry.directory,
                remote_id: &entry.remote_id,
                checksum: &entry.checksum,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(identity: &ProjectIdentity, state: &SyncState) {
    println!("{}", identity.project_name.bold());
    println!("  Project ID: {}", identity.project_id);
    if let Some(org) = &identity.organization_name {
        println!("  Organization: {org}");
    }
    let last_sync = match state.last_sync_timestamp {
        Some(ts) => format!("{} ({})", ts.to_rfc3339(), format_age(ts, Utc::now())),
        None => "never".to_string(),
    };
    println!("  Last sync: {last_sync}");
    println!("  Components: {}", state.components.len());

    if state.components.is_empty() {
        return;
    }
    let rows: Vec<ComponentRow> = state
        .components
        .iter()
        .map(|(key, entry)| ComponentRow {
            key: truncate(key, 20),
            kind: entry.kind.to_string(),
            directory: entry.directory.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Coarse "N units ago" label.
fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

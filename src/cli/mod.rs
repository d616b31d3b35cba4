//! Operator command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "trackflow", about = "Workflow-based song completion tracking", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output results as JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .trackflow/config.yaml layered with local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and apply migrations
    Init(commands::init::InitArgs),
    /// Compute completion for one or more songs
    Completion(commands::completion::CompletionArgs),
    /// Copy legacy authoring flags into dynamic progress rows
    Backfill(commands::backfill::BackfillArgs),
    /// Inspect and edit user workflows
    #[command(subcommand)]
    Workflow(commands::workflow::WorkflowCommands),
    /// Record step progress for a song
    #[command(subcommand)]
    Progress(commands::progress::ProgressCommands),
}

/// Report a failed command on stderr, as JSON when `json_mode` is set.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
}

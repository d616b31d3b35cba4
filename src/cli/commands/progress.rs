//! Progress CLI commands.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{SongId, SongProgress};

#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Mark one step of a song done or not done
    Set(SetArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("state").required(true).args(["done", "undone"])))]
pub struct SetArgs {
    pub song_id: SongId,

    pub step: String,

    /// Mark the step completed
    #[arg(long)]
    pub done: bool,

    /// Mark the step not completed
    #[arg(long)]
    pub undone: bool,

    /// Notes to store with the step; existing notes are kept when omitted
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressOutput {
    pub progress: SongProgress,
}

impl CommandOutput for ProgressOutput {
    fn to_human(&self) -> String {
        let p = &self.progress;
        let state = if p.is_completed { "done" } else { "not done" };
        let mut lines = vec![format!("Song {} step '{}' marked {}", p.song_id, p.step_name, state)];
        if let Some(at) = p.completed_at {
            lines.push(format!("Completed at: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        if let Some(notes) = &p.notes {
            lines.push(format!("Notes:        {notes}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(command: ProgressCommands, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match command {
        ProgressCommands::Set(args) => {
            let progress = ctx
                .progress_service()
                .set_step_completion(args.song_id, &args.step, args.done, args.notes)
                .await
                .with_context(|| format!("Failed to update step '{}' of song {}", args.step, args.song_id))?;
            output(&ProgressOutput { progress }, json_mode);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_human_output() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let out = ProgressOutput {
            progress: SongProgress::new(5, "drums", true, now).with_notes(Some("first pass".to_string())),
        };
        let human = out.to_human();
        assert!(human.contains("Song 5 step 'drums' marked done"));
        assert!(human.contains("2026-03-01 12:00:00 UTC"));
        assert!(human.contains("first pass"));
    }
}

//! Implementation of the `trackflow completion` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{format_percentage, output, table_with_header, truncate, CommandOutput};
use crate::domain::models::{CompletionMap, SongId};

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Song ids to compute completion for
    #[arg(required = true, num_args = 1..)]
    pub song_ids: Vec<SongId>,

    /// Include the display names of incomplete steps
    #[arg(long, short)]
    pub remaining: bool,
}

#[derive(Debug, Serialize)]
pub struct SongCompletionRow {
    pub song_id: SongId,
    pub completion: Option<u8>,
    pub remaining_steps: Vec<String>,
    pub workflow_fields: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutput {
    pub songs: Vec<SongCompletionRow>,
    /// Requested ids that do not exist.
    pub missing: Vec<SongId>,
    #[serde(skip)]
    pub show_remaining: bool,
}

impl CompletionOutput {
    fn from_results(requested: &[SongId], mut results: CompletionMap, show_remaining: bool) -> Self {
        let mut songs = Vec::with_capacity(results.len());
        let mut missing = Vec::new();
        for &song_id in requested {
            match results.remove(&song_id) {
                Some(result) => songs.push(SongCompletionRow {
                    song_id,
                    completion: result.completion,
                    remaining_steps: result.remaining_steps,
                    workflow_fields: result.workflow_fields,
                }),
                None if !missing.contains(&song_id) && !songs.iter().any(|s| s.song_id == song_id) => {
                    missing.push(song_id);
                }
                None => {}
            }
        }
        Self {
            songs,
            missing,
            show_remaining,
        }
    }
}

impl CommandOutput for CompletionOutput {
    fn to_human(&self) -> String {
        let mut header = vec!["Song", "Completion", "Steps"];
        if self.show_remaining {
            header.push("Remaining");
        }
        let mut table = table_with_header(&header);
        for song in &self.songs {
            let mut row = vec![
                song.song_id.to_string(),
                format_percentage(song.completion),
                song.workflow_fields.len().to_string(),
            ];
            if self.show_remaining {
                row.push(truncate(&song.remaining_steps.join(", "), 60));
            }
            table.add_row(row);
        }

        let mut lines = vec![table.to_string()];
        if !self.missing.is_empty() {
            let ids: Vec<String> = self.missing.iter().map(ToString::to_string).collect();
            lines.push(format!("Unknown song id(s): {}", ids.join(", ")));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: CompletionArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let songs = ctx
        .songs()
        .resolve(&args.song_ids)
        .await
        .context("Failed to resolve song owners")?;
    let results = ctx
        .completion_service()
        .completion_for(&songs, args.remaining)
        .await
        .context("Failed to compute completion")?;

    let result = CompletionOutput::from_results(&args.song_ids, results, args.remaining);
    output(&result, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CompletionResult;

    #[test]
    fn test_from_results_keeps_request_order_and_reports_missing() {
        let mut results = CompletionMap::new();
        results.insert(
            2,
            CompletionResult {
                completion: Some(50),
                remaining_steps: vec!["Bass".to_string()],
                workflow_fields: vec!["drums".to_string(), "bass".to_string()],
            },
        );
        results.insert(1, CompletionResult::undefined());

        let out = CompletionOutput::from_results(&[2, 9, 1, 9], results, true);
        let ids: Vec<SongId> = out.songs.iter().map(|s| s.song_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(out.missing, vec![9]);

        let human = out.to_human();
        assert!(human.contains("50%"));
        assert!(human.contains("Bass"));
        assert!(human.contains("Unknown song id(s): 9"));
    }

    #[test]
    fn test_json_shape() {
        let mut results = CompletionMap::new();
        results.insert(7, CompletionResult::undefined());
        let out = CompletionOutput::from_results(&[7], results, false);

        let json = out.to_json();
        assert_eq!(json["songs"][0]["song_id"], 7);
        assert!(json["songs"][0]["completion"].is_null());
        assert!(json.get("show_remaining").is_none());
    }
}

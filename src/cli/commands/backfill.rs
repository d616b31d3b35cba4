//! Implementation of the `trackflow backfill` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::services::{BackfillOptions, BackfillReport};

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Report what would be written without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip songs that already have dynamic progress
    #[arg(long)]
    pub only_missing: bool,

    /// Legacy records per batch (defaults to backfill.batch_size)
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct BackfillOutput {
    pub legacy_available: bool,
    #[serde(flatten)]
    pub report: BackfillReport,
}

impl CommandOutput for BackfillOutput {
    fn to_human(&self) -> String {
        if !self.legacy_available {
            return "Legacy authoring table not found; nothing to backfill".to_string();
        }

        let report = &self.report;
        let mut table = table_with_header(&["Metric", "Count"]);
        for (label, value) in [
            ("Batches", report.batches),
            ("Songs scanned", report.songs_scanned),
            ("Songs skipped", report.songs_skipped),
            ("Songs fully completed", report.songs_fully_completed),
            ("Rows inserted", report.rows_inserted),
            ("Rows updated", report.rows_updated),
            ("Rows unchanged", report.rows_unchanged),
        ] {
            table.add_row(vec![label.to_string(), value.to_string()]);
        }

        let heading = if report.dry_run {
            "Backfill dry run (no rows written)"
        } else {
            "Backfill complete"
        };
        format!("{heading}\n{table}")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: BackfillArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let options = BackfillOptions {
        dry_run: args.dry_run,
        only_missing: args.only_missing,
        batch_size: args.batch_size.unwrap_or(ctx.config.backfill.batch_size),
    };

    let service = ctx.backfill_service();
    let report = service.run(options).await.context("Backfill failed")?;

    let result = BackfillOutput {
        legacy_available: service.legacy_availability().is_available(),
        report,
    };
    output(&result, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_heading() {
        let out = BackfillOutput {
            legacy_available: true,
            report: BackfillReport {
                dry_run: true,
                rows_inserted: 4,
                ..BackfillReport::default()
            },
        };
        let human = out.to_human();
        assert!(human.starts_with("Backfill dry run"));
        assert!(human.contains("Rows inserted"));
        assert_eq!(out.to_json()["rows_inserted"], 4);
    }

    #[test]
    fn test_unavailable_legacy_message() {
        let out = BackfillOutput {
            legacy_available: false,
            report: BackfillReport::default(),
        };
        assert!(out.to_human().contains("not found"));
    }
}

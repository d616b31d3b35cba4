//! Implementation of the `trackflow init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::{all_embedded_migrations, create_pool, Migrator, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing project config file
    #[arg(long, short)]
    pub force: bool,

    /// Project directory that receives .trackflow/config.yaml
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

impl Default for InitArgs {
    fn default() -> Self {
        Self {
            force: false,
            path: PathBuf::from("."),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub database_path: String,
    /// Config file written by this run, if any.
    pub config_written: Option<PathBuf>,
    pub migrations_applied: usize,
    pub schema_version: i64,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(path) = &self.config_written {
            lines.push(format!("Wrote default configuration to {}", path.display()));
        }
        lines.push(if self.migrations_applied == 0 {
            format!(
                "Database at {} is up to date (schema version {})",
                self.database_path, self.schema_version
            )
        } else {
            format!(
                "Initialized database at {}\nApplied {} migration(s), schema version {}",
                self.database_path, self.migrations_applied, self.schema_version
            )
        });
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Write `config` as YAML under `root`. Returns the path when a file was written.
async fn write_config(root: &Path, config: &Config, force: bool) -> Result<Option<PathBuf>> {
    let dir = root.join(".trackflow");
    let path = dir.join("config.yaml");
    if fs::try_exists(&path).await.unwrap_or(false) && !force {
        return Ok(None);
    }

    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    fs::write(&path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let config_written = write_config(&args.path, config, args.force).await?;

    let pool = create_pool(&config.database.url(), Some(PoolConfig::from(&config.database)))
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    let migrator = Migrator::new(pool.clone());
    let migrations_applied = migrator
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to apply migrations")?;
    let schema_version = migrator
        .get_current_version()
        .await
        .context("Failed to read schema version")?;
    pool.close().await;

    let result = InitOutput {
        success: true,
        database_path: config.database.path.clone(),
        config_written,
        migrations_applied,
        schema_version,
    };
    output(&result, json_mode);
    Ok(())
}

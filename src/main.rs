//! TrackFlow CLI entry point.

use anyhow::Context;
use clap::Parser;

use trackflow::cli::{commands, AppContext, Cli, Commands};
use trackflow::infrastructure::logging::{LogConfig, LoggerImpl};
use trackflow::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        trackflow::cli::handle_error(&err, json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging)).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        command => {
            let ctx = AppContext::open(config).await?;
            let result = dispatch(command, &ctx, cli.json).await;
            ctx.pool.close().await;
            result
        }
    }
}

async fn dispatch(command: Commands, ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Init(_) => Ok(()),
        Commands::Completion(args) => commands::completion::execute(args, ctx, json).await,
        Commands::Backfill(args) => commands::backfill::execute(args, ctx, json).await,
        Commands::Workflow(command) => commands::workflow::execute(command, ctx, json).await,
        Commands::Progress(command) => commands::progress::execute(command, ctx, json).await,
    }
}

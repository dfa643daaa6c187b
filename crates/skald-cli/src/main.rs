//! Skald CLI - Review relationship suggestions and recalibrate feature weights.

use anyhow::Context;
use clap::Parser;
use skald_cli::commands;
use skald_cli::{Cli, Command, Config, Formatter};
use skald_review::SuggestionLifecycle;
use skald_store::SqliteStore;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so table and JSON output stay clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::path()?,
    };

    // Determine output format
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let formatter = Formatter::new(format, !cli.no_color && config.settings.color);

    let database = cli.db.clone().unwrap_or_else(|| config.database.clone());
    let lifecycle = SuggestionLifecycle::new(config.review.clone())?;
    let actor = cli.actor.clone().unwrap_or_else(|| config.settings.actor.clone());

    match cli.command {
        Command::Init { force } => commands::execute_init(&config_path, force, &formatter)?,
        Command::Pending(args) => {
            commands::execute_pending(args, &open_store(&database)?, &lifecycle, &formatter)?
        }
        Command::Show(args) => {
            commands::execute_show(args, &open_store(&database)?, &lifecycle, &formatter)?
        }
        Command::Accept(args) => {
            commands::execute_accept(args, &mut open_store(&database)?, &lifecycle, &actor, &formatter)?
        }
        Command::Reject(args) => {
            commands::execute_reject(args, &mut open_store(&database)?, &lifecycle, &actor, &formatter)?
        }
        Command::Modify(args) => {
            commands::execute_modify(args, &mut open_store(&database)?, &lifecycle, &actor, &formatter)?
        }
        Command::Dismiss(args) => {
            commands::execute_dismiss(args, &mut open_store(&database)?, &lifecycle, &actor, &formatter)?
        }
        Command::Suggest(args) => {
            commands::execute_suggest(args, &mut open_store(&database)?, &lifecycle, &formatter)?
        }
        Command::Weights(args) => {
            commands::execute_weights(args, &mut open_store(&database)?, &config.learner, &formatter)?
        }
        Command::Recalibrate(args) => {
            commands::execute_recalibrate(args, &mut open_store(&database)?, &config.learner, &formatter)?
        }
        Command::Worker(args) => {
            commands::execute_worker(args, open_store(&database)?, &config.learner, &formatter).await?
        }
    }

    Ok(())
}

/// Open the database, creating its directory on first use
fn open_store(database: &Path) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SqliteStore::new(database).with_context(|| format!("Failed to open database {}", database.display()))
}

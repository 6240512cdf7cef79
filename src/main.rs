//! kvsearch server & CLI
//!
//! - `serve` (default): HTTP API plus static files
//! - `search`: rank the records of a data file against clauses
//! - `identifier`: sanitize a display string into an identifier

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use kvsearch::config::{self, Config};
use kvsearch::error::{exit_code_for, AppError};
use kvsearch::http::{self, AppState};
use kvsearch::search::SearchEngine;
use kvsearch::store::{self, seed, Store};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code_for(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())
        .map_err(|e| AppError::ConfigError(format!("{:#}", e)))?;

    kvsearch::logging::init_logging(&config.logging, cli.severity_override())?;
    if config.uses_builtin_defaults() {
        info!("No {} found, using built-in defaults", config::CONFIG_FILE_NAME);
    }
    debug!(
        environment = config.environment.as_deref().unwrap_or("default"),
        source = ?config.source,
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Serve(args)) => execute_serve(config, args).await,
        None => execute_serve(config, cli::ServeArgs::default()).await,
        Some(Commands::Search(args)) => {
            let output = execute_search(&config, args)?;
            println!("{}", output);
            Ok(())
        }
        Some(Commands::Identifier(args)) => {
            println!("{}", store::create_identifier(&args.raw));
            Ok(())
        }
    }
}

/// Load a seed file into the store, failing when it cannot be read
fn seed_from(store: &Store, path: &Path) -> Result<usize> {
    seed::load_file(store, path)
        .with_context(|| format!("Failed to load records from {}", path.display()))
}

async fn execute_serve(mut config: Config, args: cli::ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Arc::new(Store::default());
    if let Some(path) = args.data.as_ref().or(config.data.seed_file.as_ref()) {
        seed_from(&store, path)?;
    }

    let engine = Arc::new(SearchEngine::new(config.search.vocabulary()));
    let state = AppState::new(store, engine, &config.server);

    info!("Starting kvsearch server");
    http::serve(state, &config.server).await
}

fn execute_search(config: &Config, args: cli::SearchArgs) -> Result<String> {
    let store = Store::default();
    seed_from(&store, &args.data)?;

    let engine = SearchEngine::new(config.search.vocabulary());
    let results = engine.search_above(&store, &args.clauses, args.min_weight)?;
    info!("{} records scored above {}", results.len(), args.min_weight);

    Ok(serde_json::to_string_pretty(&results)?)
}

//! CLI mode implementation
//!
//! Provides the command-line interface: run the server, query a data file,
//! or sanitize identifiers.

use kvsearch::search::QueryClause;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kvsearch CLI
#[derive(Parser, Debug)]
#[command(name = "kvsearch")]
#[command(about = "In-memory record store with ranked multi-field search", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./configuration.json)
    #[arg(short, long, global = true, env = "KVSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Severity threshold forced by the verbosity flags
    pub fn severity_override(&self) -> Option<u8> {
        if self.quiet {
            Some(3)
        } else if self.verbose {
            Some(0)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API and static files
    Serve(ServeArgs),
    /// Run a ranked search over a data file
    Search(SearchArgs),
    /// Print the URL-safe identifier for a display string
    Identifier(IdentifierArgs),
}

/// Serve command arguments
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// JSON array of records to load at startup
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Port to listen on (overrides configuration and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Search command arguments
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// JSON array of records to search
    #[arg(short, long)]
    pub data: PathBuf,

    /// Query clause as property:term,term (prefix with + for mandatory)
    #[arg(short = 'q', long = "clause", required = true)]
    pub clauses: Vec<QueryClause>,

    /// Only return results scoring above this weight
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub min_weight: f64,
}

/// Identifier command arguments
#[derive(Parser, Debug)]
pub struct IdentifierArgs {
    /// Display string to sanitize
    pub raw: String,
}

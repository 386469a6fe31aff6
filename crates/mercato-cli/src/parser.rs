//! Root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Run and maintain a mercato marketplace.
#[derive(Parser)]
#[command(name = "mercato")]
#[command(about = "Run and maintain a mercato marketplace")]
#[command(version)]
pub struct Cli {
    /// Override the `SQLite` database file for this invocation
    #[arg(long = "database", global = true, env = "MERCATO_DATABASE_PATH")]
    pub database: Option<std::path::PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

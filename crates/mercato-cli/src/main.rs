//! CLI entry point - the composition root.
//!
//! Loads `.env`, initializes logging, reads configuration and dispatches
//! to a handler.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mercato_cli::bootstrap::load_config;
use mercato_cli::{Cli, CliError, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.database)?;

    if let Commands::Serve { port } = cli.command {
        return handlers::serve::execute(config, port).await;
    }

    let ctx = bootstrap(&config).await?;
    match cli.command {
        Commands::Serve { .. } => {}
        Commands::Seed { reset, password } => {
            handlers::seed::execute(&ctx, reset, &password).await?;
        }
        Commands::Cleanup { dry_run } => {
            handlers::cleanup::execute(&ctx, dry_run).await?;
        }
        Commands::PromoteAdmin { email } => {
            handlers::admin::promote(&ctx, &email).await?;
        }
        Commands::ListBusinesses { json } => {
            handlers::businesses::list(&ctx, json).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load before parsing so `env` arguments see .env values
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(err.downcast_ref::<CliError>().map_or(1, CliError::exit_code))
        }
    }
}

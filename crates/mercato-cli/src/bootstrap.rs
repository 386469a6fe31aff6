//! CLI bootstrap - the composition root for maintenance commands.
//!
//! `serve` hands its configuration to `mercato_axum::start_server`; every
//! other command runs against the [`CliContext`] built here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use mercato_axum::ServerConfig;
use mercato_core::AppCore;
use mercato_db::{CoreFactory, SqlitePool, setup_database};
use mercato_providers::build_providers;

/// Read the process configuration, applying a command-line database override.
pub fn load_config(database: Option<PathBuf>) -> Result<ServerConfig> {
    let mut config = ServerConfig::from_env().context("reading configuration from environment")?;
    if let Some(path) = database {
        config.database_path = path;
    }
    Ok(config)
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// The core application facade.
    pub app: AppCore,
    /// Pool behind `app`, kept for whole-database operations.
    pub pool: SqlitePool,
}

impl CliContext {
    pub const fn app(&self) -> &AppCore {
        &self.app
    }
}

/// Open the database and assemble the core services.
pub async fn bootstrap(config: &ServerConfig) -> Result<CliContext> {
    let pool = setup_database(&config.database_path)
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let providers = build_providers(&config.providers).context("building provider clients")?;
    let app = CoreFactory::build_app_core(pool.clone(), providers, config.marketplace.clone());
    Ok(CliContext { app, pool })
}

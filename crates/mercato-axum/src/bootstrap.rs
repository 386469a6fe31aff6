//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the HTTP adapter: database pool, provider clients and `AppCore`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use mercato_core::{AppCore, MarketplaceConfig, SubscriptionTier};
use mercato_db::{CoreFactory, setup_database};
use mercato_providers::{ProvidersConfig, ProvidersConfigError, StorageConfig, build_providers};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("{key} must be a valid port number, got '{value}'")]
    InvalidPort { key: &'static str, value: String },

    #[error(transparent)]
    Providers(#[from] ProvidersConfigError),
}

/// Server configuration for the HTTP adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// `SQLite` database file.
    pub database_path: PathBuf,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Public URL and subscription prices.
    pub marketplace: MarketplaceConfig,
    /// Outbound provider clients.
    pub providers: ProvidersConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATA_DIR).join("mercato.db"),
            cors: CorsConfig::default(),
            marketplace: MarketplaceConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(port) = get("MERCATO_PORT") {
            config.port = port.parse().map_err(|_| ServerConfigError::InvalidPort {
                key: "MERCATO_PORT",
                value: port.clone(),
            })?;
        }

        config.database_path = match get("MERCATO_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(get("MERCATO_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()))
                .join("mercato.db"),
        };

        if let Some(origins) = get("MERCATO_CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() && origins != ["*"] {
                config.cors = CorsConfig::AllowOrigins(origins);
            }
        }

        let mut marketplace = get("MERCATO_PUBLIC_URL")
            .map_or_else(MarketplaceConfig::default, MarketplaceConfig::new);
        if let Some(price) = get("PAYMENTS_PRICE_PRO") {
            marketplace = marketplace.with_price(SubscriptionTier::Pro, price);
        }
        if let Some(price) = get("PAYMENTS_PRICE_PREMIUM") {
            marketplace = marketplace.with_price(SubscriptionTier::Premium, price);
        }
        config.marketplace = marketplace;

        config.providers = ProvidersConfig::from_lookup(&lookup)?;
        Ok(config)
    }
}

/// Locally stored uploads served by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    pub dir: PathBuf,
    /// URL path the directory is mounted at, e.g. `/media`.
    pub public_path: String,
}

/// Application context for the HTTP adapter.
pub struct AxumContext {
    /// The core application facade.
    pub core: Arc<AppCore>,
    /// Set when uploads live on the local filesystem.
    pub local_media: Option<LocalMedia>,
}

impl AxumContext {
    pub const fn new(core: Arc<AppCore>) -> Self {
        Self {
            core,
            local_media: None,
        }
    }

    #[must_use]
    pub fn with_local_media(mut self, dir: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        self.local_media = Some(LocalMedia {
            dir: dir.into(),
            public_path: public_path.into(),
        });
        self
    }
}

/// Bootstrap the HTTP server with all services.
pub async fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    info!(
        database_path = %config.database_path.display(),
        public_url = %config.marketplace.public_base_url,
        "Bootstrapping mercato API"
    );

    // 1. Create database pool with full schema setup
    let pool = setup_database(&config.database_path)
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    // 2. Provider clients over one shared HTTP backend
    let providers = build_providers(&config.providers).context("building provider clients")?;

    // 3. Assemble AppCore
    let core = Arc::new(CoreFactory::build_app_core(
        pool,
        providers,
        config.marketplace.clone(),
    ));

    let mut ctx = AxumContext::new(core);
    if let StorageConfig::Local { dir, public_path } = &config.providers.storage {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating upload directory {}", dir.display()))?;
        ctx = ctx.with_local_media(dir.clone(), public_path.clone());
    }
    Ok(ctx)
}

/// Start the web server on the configured port and serve until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(&config).await?;
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("mercato API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("mercato API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, PathBuf::from("data/mercato.db"));
        assert_eq!(config.cors, CorsConfig::AllowAll);
        assert!(config.marketplace.price_pro.is_none());
    }

    #[test]
    fn test_env_values() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MERCATO_PORT", "9000"),
            ("MERCATO_DATA_DIR", "/srv/mercato"),
            ("MERCATO_PUBLIC_URL", "https://mercato.example.com"),
            ("MERCATO_CORS_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("PAYMENTS_PRICE_PRO", "price_pro"),
            ("PAYMENTS_SECRET_KEY", "sk_live"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/srv/mercato/mercato.db"));
        assert_eq!(
            config.cors,
            CorsConfig::AllowOrigins(vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ])
        );
        assert_eq!(config.marketplace.url("/x"), "https://mercato.example.com/x");
        assert_eq!(
            config.marketplace.price_for(SubscriptionTier::Pro),
            Some("price_pro")
        );
        assert_eq!(config.providers.payments.secret_key.as_deref(), Some("sk_live"));
    }

    #[test]
    fn test_database_path_overrides_data_dir() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MERCATO_DATA_DIR", "/srv/mercato"),
            ("MERCATO_DATABASE_PATH", "/tmp/m.db"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/m.db"));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MERCATO_PORT", "eighty")])),
            Err(ServerConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("STORAGE_PROVIDER", "ftp")])),
            Err(ServerConfigError::Providers(_))
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_creates_database_and_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.database_path = dir.path().join("db/mercato.db");
        config.providers = ProvidersConfig::new().with_storage(StorageConfig::Local {
            dir: dir.path().join("uploads"),
            public_path: "/media".to_string(),
        });

        let ctx = bootstrap(&config).await.unwrap();
        assert!(config.database_path.exists());
        assert_eq!(
            ctx.local_media.map(|m| m.public_path),
            Some("/media".to_string())
        );
        assert!(dir.path().join("uploads").is_dir());
    }
}

//! Maintenance commands against a real database file.

use mercato_axum::ServerConfig;
use mercato_cli::handlers::{admin, businesses, cleanup, seed};
use mercato_cli::{CliContext, CliError, bootstrap};
use mercato_core::UserRole;
use mercato_core::services::DEFAULT_SEED_PASSWORD;
use tempfile::TempDir;

async fn context(dir: &TempDir) -> CliContext {
    let mut config = ServerConfig::default();
    config.database_path = dir.path().join("mercato.db");
    bootstrap(&config).await.unwrap()
}

#[tokio::test]
async fn seed_is_idempotent_and_reset_starts_over() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;

    let first = seed::execute(&ctx, false, DEFAULT_SEED_PASSWORD).await.unwrap();
    assert!(first.users > 0);
    assert!(first.businesses > 0);

    let second = seed::execute(&ctx, false, DEFAULT_SEED_PASSWORD).await.unwrap();
    assert_eq!(second.users, 0);
    assert_eq!(second.businesses, 0);

    let listings = ctx.app().businesses().list_all().await.unwrap();
    assert_eq!(listings.len(), first.businesses);
    assert!(listings.iter().any(|b| b.is_ai_agent));
    assert_eq!(businesses::list(&ctx, false).await.unwrap(), first.businesses);

    let reseeded = seed::execute(&ctx, true, DEFAULT_SEED_PASSWORD).await.unwrap();
    assert_eq!(reseeded, first);
}

#[tokio::test]
async fn seed_rejects_short_password() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;

    let err = seed::execute(&ctx, false, "short").await.unwrap_err();
    assert!(matches!(err, CliError::Arguments(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn promote_admin_requires_existing_account() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    seed::execute(&ctx, false, DEFAULT_SEED_PASSWORD).await.unwrap();

    let user = admin::promote(&ctx, "Chloe@Mercato.test").await.unwrap();
    assert_eq!(user.role, UserRole::Admin);

    let err = admin::promote(&ctx, "nobody@mercato.test").await.unwrap_err();
    assert!(matches!(err, CliError::NotFound(_)));
    assert_eq!(err.exit_code(), 67);
}

#[tokio::test]
async fn cleanup_on_fresh_database_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    seed::execute(&ctx, false, DEFAULT_SEED_PASSWORD).await.unwrap();

    let report = cleanup::execute(&ctx, true).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.expired_sessions, 0);
    assert!(report.cancelled_missions.is_empty());

    let report = cleanup::execute(&ctx, false).await.unwrap();
    assert!(!report.dry_run);
    assert!(report.cancelled_missions.is_empty());
}

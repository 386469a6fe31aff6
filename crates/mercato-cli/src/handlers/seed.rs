//! Seed command handler.

use mercato_core::SeedReport;
use mercato_db::reset_database;
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Load the demo data set, optionally wiping the database first.
///
/// Seeding is idempotent: accounts and listings that already exist are
/// left alone and not counted.
pub async fn execute(ctx: &CliContext, reset: bool, password: &str) -> Result<SeedReport, CliError> {
    if reset {
        warn!("Deleting all rows before seeding");
        reset_database(&ctx.pool)
            .await
            .map_err(|e| CliError::Database(e.to_string()))?;
    }

    let report = ctx.app().maintenance().seed(password).await?;
    println!(
        "Seeded {} user(s), {} listing(s), {} service(s), {} mission(s).",
        report.users, report.businesses, report.services, report.missions
    );
    if report.users > 0 {
        println!("Demo accounts use the password from --password / MERCATO_SEED_PASSWORD.");
    }
    Ok(report)
}

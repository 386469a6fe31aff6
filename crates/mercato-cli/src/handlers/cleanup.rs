//! Cleanup command handler.

use mercato_core::CleanupReport;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, dry_run: bool) -> Result<CleanupReport, CliError> {
    let report = ctx.app().maintenance().cleanup(dry_run).await?;

    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!("{verb} {} expired session(s).", report.expired_sessions);

    let verb = if dry_run { "Would cancel" } else { "Cancelled" };
    if report.cancelled_missions.is_empty() {
        println!("{verb} 0 stale mission(s).");
    } else {
        let ids: Vec<String> = report.cancelled_missions.iter().map(i64::to_string).collect();
        println!(
            "{verb} {} stale mission(s): {}",
            report.cancelled_missions.len(),
            ids.join(", ")
        );
    }
    Ok(report)
}

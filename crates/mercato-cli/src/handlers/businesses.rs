//! List command handler.

use std::collections::HashMap;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{ListingRow, print_listing_table};

/// Print every listing with its owner's email. Returns how many were listed.
pub async fn list(ctx: &CliContext, json: bool) -> Result<usize, CliError> {
    let businesses = ctx.app().businesses().list_all().await?;

    if json {
        let body = serde_json::to_string_pretty(&businesses)
            .map_err(|e| CliError::Core(e.to_string()))?;
        println!("{body}");
        return Ok(businesses.len());
    }

    if businesses.is_empty() {
        println!("No listings found.");
        println!("Use 'mercato seed' to load demo data.");
        return Ok(0);
    }

    let owners: HashMap<i64, String> = ctx
        .app()
        .maintenance()
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect();

    let rows: Vec<ListingRow<'_>> = businesses
        .iter()
        .map(|b| ListingRow {
            business: b,
            owner_email: owners.get(&b.owner_id).map(String::as_str),
        })
        .collect();

    println!("Found {} listing(s):\n", rows.len());
    print_listing_table(&rows);
    Ok(rows.len())
}

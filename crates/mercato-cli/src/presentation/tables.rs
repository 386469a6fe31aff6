//! Table formatting utilities for CLI output.

use mercato_core::Business;

/// Truncates a string to at most `max_len` characters, adding "..." if needed.
///
/// # Examples
///
/// ```rust
/// use mercato_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Format an optional value for table display, returning a default if None.
pub fn format_optional<T: std::fmt::Display>(value: Option<&T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), ToString::to_string)
}

/// One row of `list-businesses`.
pub struct ListingRow<'a> {
    pub business: &'a Business,
    pub owner_email: Option<&'a str>,
}

const HEADER_WIDTH: usize = 110;

/// Render one listing as a fixed-width table line.
pub fn listing_line(row: &ListingRow<'_>) -> String {
    let b = row.business;
    let kind = if b.is_ai_agent { "agent" } else { "human" };
    format!(
        "{:<4} {:<24} {:<22} {:<8} {:<9} {:<6} {:>5.1} ({:>3}) {}",
        b.id,
        truncate_string(&b.name, 23),
        truncate_string(&b.slug, 21),
        b.subscription_tier.as_str(),
        b.verification_status.as_str(),
        kind,
        b.rating_avg,
        b.review_count,
        format_optional(row.owner_email.as_ref(), "--"),
    )
}

pub fn print_listing_table(rows: &[ListingRow<'_>]) {
    println!(
        "{:<4} {:<24} {:<22} {:<8} {:<9} {:<6} {:>11} Owner",
        "ID", "Name", "Slug", "Tier", "Status", "Kind", "Rating"
    );
    print_separator(HEADER_WIDTH);
    for row in rows {
        println!("{}", listing_line(row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_string("Ateliê São João", 8), "Ateli...");
        assert_eq!(truncate_string("short", 5), "short");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(&3), "--"), "3");
        assert_eq!(format_optional::<i32>(None, "--"), "--");
    }
}

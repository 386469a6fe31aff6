//! Terminal output helpers.

mod tables;

pub use tables::{ListingRow, format_optional, listing_line, print_listing_table, print_separator, truncate_string};

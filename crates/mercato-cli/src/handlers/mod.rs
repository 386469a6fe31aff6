//! Command handlers. Each one delegates to `AppCore` and prints a summary.

pub mod admin;
pub mod businesses;
pub mod cleanup;
pub mod seed;
pub mod serve;

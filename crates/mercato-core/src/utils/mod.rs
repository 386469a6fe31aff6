//! Shared utility functions.

pub mod credentials;
pub mod validation;

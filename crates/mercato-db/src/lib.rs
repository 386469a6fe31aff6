//! `SQLite` persistence for the Mercato marketplace.
//!
//! Implements every repository port from `mercato-core` on top of `sqlx`.
//! Entry points call [`setup_database`] once and hand the pool to
//! [`CoreFactory`].

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::CoreFactory;

// Re-export TestDb for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

// Re-export repository implementations
pub use repositories::{
    SqliteAgentRepository, SqliteBusinessRepository, SqliteCalendarRepository,
    SqliteClientRepository, SqliteInvoiceRepository, SqliteMediaRepository,
    SqliteMissionRepository, SqlitePaymentRepository, SqliteProjectRepository,
    SqliteReviewRepository, SqliteServiceRepository, SqliteSessionRepository,
    SqliteSettingsRepository, SqliteTaskRepository, SqliteTimeEntryRepository,
    SqliteUserRepository,
};

// Pool type handed to CoreFactory and reset_database
pub use sqlx::SqlitePool;

// Re-export setup functions for convenient access
pub use setup::{reset_database, setup_database};
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

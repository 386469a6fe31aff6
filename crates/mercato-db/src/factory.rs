//! Composition utilities for building `AppCore` with `SQLite` backends.
//!
//! This module provides factory functions for wiring up the application
//! with `SQLite` repositories. It is focused purely on construction and
//! should not contain any domain logic.

use sqlx::SqlitePool;
use std::sync::Arc;

use mercato_core::services::AppCore;
use mercato_core::{MarketplaceConfig, Providers, Repos};

use crate::repositories::{
    SqliteAgentRepository, SqliteBusinessRepository, SqliteCalendarRepository,
    SqliteClientRepository, SqliteInvoiceRepository, SqliteMediaRepository,
    SqliteMissionRepository, SqlitePaymentRepository, SqliteProjectRepository,
    SqliteReviewRepository, SqliteServiceRepository, SqliteSessionRepository,
    SqliteSettingsRepository, SqliteTaskRepository, SqliteTimeEntryRepository,
    SqliteUserRepository,
};

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Build all `SQLite` repositories from a pool.
    ///
    /// This is the recommended way for adapters to obtain repositories.
    /// Returns a `Repos` struct from `mercato-core` containing
    /// trait-object-wrapped repositories.
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos {
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            sessions: Arc::new(SqliteSessionRepository::new(pool.clone())),
            businesses: Arc::new(SqliteBusinessRepository::new(pool.clone())),
            services: Arc::new(SqliteServiceRepository::new(pool.clone())),
            reviews: Arc::new(SqliteReviewRepository::new(pool.clone())),
            media: Arc::new(SqliteMediaRepository::new(pool.clone())),
            missions: Arc::new(SqliteMissionRepository::new(pool.clone())),
            payments: Arc::new(SqlitePaymentRepository::new(pool.clone())),
            agents: Arc::new(SqliteAgentRepository::new(pool.clone())),
            clients: Arc::new(SqliteClientRepository::new(pool.clone())),
            projects: Arc::new(SqliteProjectRepository::new(pool.clone())),
            tasks: Arc::new(SqliteTaskRepository::new(pool.clone())),
            invoices: Arc::new(SqliteInvoiceRepository::new(pool.clone())),
            time_entries: Arc::new(SqliteTimeEntryRepository::new(pool.clone())),
            events: Arc::new(SqliteCalendarRepository::new(pool.clone())),
            settings: Arc::new(SqliteSettingsRepository::new(pool)),
        }
    }

    /// Build a complete `AppCore` instance from a pool and provider clients.
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// let repos = CoreFactory::build_repos(pool);
    /// let core = AppCore::new(repos, providers, config);
    /// ```
    pub fn build_app_core(
        pool: SqlitePool,
        providers: Providers,
        config: MarketplaceConfig,
    ) -> AppCore {
        let repos = Self::build_repos(pool);
        AppCore::new(repos, providers, config)
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` database with the production schema
/// already applied.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database with full schema.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All repositories over this database.
    pub fn repos(&self) -> Repos {
        CoreFactory::build_repos(self.pool.clone())
    }

    pub fn user_repository(&self) -> SqliteUserRepository {
        SqliteUserRepository::new(self.pool.clone())
    }

    pub fn session_repository(&self) -> SqliteSessionRepository {
        SqliteSessionRepository::new(self.pool.clone())
    }

    pub fn business_repository(&self) -> SqliteBusinessRepository {
        SqliteBusinessRepository::new(self.pool.clone())
    }

    pub fn service_repository(&self) -> SqliteServiceRepository {
        SqliteServiceRepository::new(self.pool.clone())
    }

    pub fn review_repository(&self) -> SqliteReviewRepository {
        SqliteReviewRepository::new(self.pool.clone())
    }

    pub fn mission_repository(&self) -> SqliteMissionRepository {
        SqliteMissionRepository::new(self.pool.clone())
    }

    pub fn payment_repository(&self) -> SqlitePaymentRepository {
        SqlitePaymentRepository::new(self.pool.clone())
    }

    pub fn client_repository(&self) -> SqliteClientRepository {
        SqliteClientRepository::new(self.pool.clone())
    }

    pub fn project_repository(&self) -> SqliteProjectRepository {
        SqliteProjectRepository::new(self.pool.clone())
    }

    pub fn task_repository(&self) -> SqliteTaskRepository {
        SqliteTaskRepository::new(self.pool.clone())
    }

    pub fn invoice_repository(&self) -> SqliteInvoiceRepository {
        SqliteInvoiceRepository::new(self.pool.clone())
    }

    pub fn time_entry_repository(&self) -> SqliteTimeEntryRepository {
        SqliteTimeEntryRepository::new(self.pool.clone())
    }

    pub fn calendar_repository(&self) -> SqliteCalendarRepository {
        SqliteCalendarRepository::new(self.pool.clone())
    }
}

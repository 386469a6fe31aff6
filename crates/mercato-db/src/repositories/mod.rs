//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod row_mappers;
mod sqlite_agent_repository;
mod sqlite_business_repository;
mod sqlite_crm_repository;
mod sqlite_invoice_repository;
mod sqlite_media_repository;
mod sqlite_mission_repository;
mod sqlite_schedule_repository;
mod sqlite_settings_repository;
mod sqlite_user_repository;

pub use sqlite_agent_repository::SqliteAgentRepository;
pub use sqlite_business_repository::{
    SqliteBusinessRepository, SqliteReviewRepository, SqliteServiceRepository,
};
pub use sqlite_crm_repository::{
    SqliteClientRepository, SqliteProjectRepository, SqliteTaskRepository,
};
pub use sqlite_invoice_repository::SqliteInvoiceRepository;
pub use sqlite_media_repository::SqliteMediaRepository;
pub use sqlite_mission_repository::{SqliteMissionRepository, SqlitePaymentRepository};
pub use sqlite_schedule_repository::{SqliteCalendarRepository, SqliteTimeEntryRepository};
pub use sqlite_settings_repository::SqliteSettingsRepository;
pub use sqlite_user_repository::{SqliteSessionRepository, SqliteUserRepository};

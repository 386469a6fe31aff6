//! Core domain, ports and services for the Mercato marketplace.
//!
//! This crate has no knowledge of SQL, HTTP or any provider SDK. Adapters
//! (`mercato-db`, `mercato-providers`, `mercato-axum`, `mercato-cli`)
//! implement the [`ports`] and drive the [`services`] through [`AppCore`].

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::MarketplaceConfig;
pub use domain::*;
pub use ports::{
    AgentRepository, BusinessRepository, CalendarRepository, ChatCompletionPort, ChatTurn,
    CheckoutMode, CheckoutRequest, CheckoutSession, ClientRepository, ConversionEvent,
    ConversionTrackerPort, CoreError, InvoiceRepository, MediaRepository, MissionRepository,
    NoopConversionTracker, ObjectStoragePort, PaymentEvent, PaymentGatewayPort, PaymentRepository,
    ProjectRepository, ProviderError, Providers, Repos, RepositoryError, ReviewRepository,
    ServiceRepository, SessionRepository, SettingsRepository, StoredObject, TaskRepository,
    TimeEntryRepository, TransferRequest, UserRepository, WebhookEvent,
};
pub use services::{AppCore, CleanupReport, SeedReport, WebhookOutcome};
pub use settings::{PlatformSettings, PlatformSettingsUpdate, SettingsError, validate_settings};
pub use utils::validation::ValidationErrors;


//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or `reqwest` types in any signature
//! - Repository traits are CRUD-focused; ownership and role checks live in services
//! - Every workspace repository method takes the `owner_id` it is scoped to
//! - Provider ports describe intent (create a checkout, transfer funds), not HTTP

pub mod agent_repository;
pub mod business_repository;
pub mod chat_completion;
pub mod conversions;
pub mod media_repository;
pub mod mission_repository;
pub mod object_storage;
pub mod payments;
pub mod settings_repository;
pub mod user_repository;
pub mod workspace_repository;

use std::sync::Arc;
use thiserror::Error;

use crate::utils::validation::ValidationErrors;

pub use agent_repository::AgentRepository;
pub use business_repository::{BusinessRepository, ReviewRepository, ServiceRepository};
pub use chat_completion::{ChatCompletionPort, ChatTurn};
pub use conversions::{ConversionEvent, ConversionTrackerPort, NoopConversionTracker};
pub use media_repository::MediaRepository;
pub use mission_repository::{MissionRepository, PaymentRepository};
pub use object_storage::{ObjectStoragePort, StoredObject};
pub use payments::{
    CheckoutMode, CheckoutRequest, CheckoutSession, PaymentEvent, PaymentGatewayPort,
    TransferRequest, WebhookEvent,
};
pub use settings_repository::SettingsRepository;
pub use user_repository::{SessionRepository, UserRepository};
pub use workspace_repository::{
    CalendarRepository, ClientRepository, InvoiceRepository, ProjectRepository, TaskRepository,
    TimeEntryRepository,
};

/// Container for all repository trait objects.
///
/// This struct provides a consistent way to wire repositories across adapters
/// without coupling them to concrete implementations. It lives in
/// `mercato-core` so that `AppCore` can accept it without depending on
/// `mercato-db`.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub businesses: Arc<dyn BusinessRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub media: Arc<dyn MediaRepository>,
    pub missions: Arc<dyn MissionRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub time_entries: Arc<dyn TimeEntryRepository>,
    pub events: Arc<dyn CalendarRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

/// Container for the outbound SaaS integrations.
#[derive(Clone)]
pub struct Providers {
    pub payments: Arc<dyn PaymentGatewayPort>,
    pub chat: Arc<dyn ChatCompletionPort>,
    pub storage: Arc<dyn ObjectStoragePort>,
    pub conversions: Arc<dyn ConversionTrackerPort>,
}

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for services to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., foreign key, check constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Errors reported by provider ports (payments, chat, storage, conversions).
///
/// Provider crates keep their own transport errors internally and map them
/// to this type at the boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The integration has no credentials configured.
    #[error("{0} is not configured")]
    NotConfigured(String),

    /// An inbound webhook failed signature or timestamp verification.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The provider answered with a client error.
    #[error("Provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider could not be reached or kept failing.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something we could not interpret.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Core error type for semantic domain errors.
///
/// This is the canonical error type used across the core domain.
/// Adapters map it to their own error types (HTTP status codes,
/// CLI exit codes).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Outbound integration failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Request input failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No valid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The entity does not exist or is not visible to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity is not in a state that allows the action.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (unexpected condition).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl CoreError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// Whether this error means "the thing does not exist".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Repository(RepositoryError::NotFound(_))
        )
    }
}

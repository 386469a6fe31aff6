//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain logic.
//! They don't know about concrete implementations.

mod agent_service;
mod app_core;
mod auth_service;
mod business_service;
mod escrow_service;
mod maintenance_service;
mod media_service;
mod mission_service;
mod settings_service;
mod subscription_service;
mod webhook_service;
mod workspace_service;

pub use agent_service::{AgentService, build_system_prompt};
pub use app_core::AppCore;
pub use auth_service::AuthService;
pub use business_service::BusinessService;
pub use escrow_service::{EscrowService, KIND_MISSION, METADATA_KIND, METADATA_MISSION_ID};
pub use maintenance_service::{
    CleanupReport, DEFAULT_SEED_PASSWORD, MaintenanceService, SeedReport,
};
pub use media_service::{MediaService, extension_for};
pub use mission_service::MissionService;
pub use settings_service::SettingsService;
pub use subscription_service::{
    KIND_SUBSCRIPTION, METADATA_TIER, METADATA_USER_ID, SubscriptionService,
};
pub use webhook_service::{WebhookOutcome, WebhookService};
pub use workspace_service::{WorkspaceService, invoice_number};

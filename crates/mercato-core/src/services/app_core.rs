//! `AppCore` - the primary application facade.
//!
//! This is the composition root for core services. Adapters (HTTP, CLI)
//! receive an `AppCore` instance and use it to access all functionality.

use std::sync::Arc;

use crate::config::MarketplaceConfig;
use crate::ports::{Providers, Repos};

use super::{
    AgentService, AuthService, BusinessService, EscrowService, MaintenanceService, MediaService,
    MissionService, SettingsService, SubscriptionService, WebhookService, WorkspaceService,
};

/// The core application facade.
///
/// `AppCore` is constructed at the adapter's composition root with concrete
/// repositories and provider clients.
///
/// # Example
///
/// ```ignore
/// let repos = CoreFactory::build_repos(pool);
/// let providers = build_providers(&providers_config)?;
/// let core = AppCore::new(repos, providers, MarketplaceConfig::default());
///
/// let page = core.businesses().search(BusinessSearch::default()).await?;
/// ```
pub struct AppCore {
    auth: AuthService,
    businesses: BusinessService,
    missions: MissionService,
    escrow: EscrowService,
    subscriptions: SubscriptionService,
    webhooks: WebhookService,
    agents: AgentService,
    media: MediaService,
    workspace: WorkspaceService,
    settings: SettingsService,
    maintenance: MaintenanceService,
    config: Arc<MarketplaceConfig>,
}

impl AppCore {
    pub fn new(repos: Repos, providers: Providers, config: MarketplaceConfig) -> Self {
        let config = Arc::new(config);

        let escrow = EscrowService::new(
            repos.missions.clone(),
            repos.payments.clone(),
            repos.businesses.clone(),
            repos.users.clone(),
            repos.settings.clone(),
            providers.payments.clone(),
            config.clone(),
        );
        let subscriptions = SubscriptionService::new(
            repos.users.clone(),
            repos.businesses.clone(),
            repos.settings.clone(),
            providers.payments.clone(),
            config.clone(),
        );
        let webhooks =
            WebhookService::new(providers.payments, escrow.clone(), subscriptions.clone());

        Self {
            auth: AuthService::new(
                repos.users.clone(),
                repos.sessions.clone(),
                repos.settings.clone(),
                providers.conversions,
            ),
            businesses: BusinessService::new(
                repos.businesses.clone(),
                repos.services.clone(),
                repos.reviews,
            ),
            missions: MissionService::new(
                repos.missions.clone(),
                repos.payments,
                repos.businesses.clone(),
            ),
            escrow,
            subscriptions,
            webhooks,
            agents: AgentService::new(
                repos.businesses.clone(),
                repos.services.clone(),
                repos.agents,
                repos.settings.clone(),
                providers.chat,
            ),
            media: MediaService::new(
                repos.media,
                repos.businesses.clone(),
                repos.settings.clone(),
                providers.storage,
            ),
            workspace: WorkspaceService::new(
                repos.clients,
                repos.projects,
                repos.tasks,
                repos.invoices,
                repos.time_entries,
                repos.events,
            ),
            settings: SettingsService::new(repos.settings.clone()),
            maintenance: MaintenanceService::new(
                repos.users,
                repos.sessions,
                repos.businesses,
                repos.services,
                repos.missions,
                repos.settings,
            ),
            config,
        }
    }

    pub const fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub const fn businesses(&self) -> &BusinessService {
        &self.businesses
    }

    pub const fn missions(&self) -> &MissionService {
        &self.missions
    }

    pub const fn escrow(&self) -> &EscrowService {
        &self.escrow
    }

    pub const fn subscriptions(&self) -> &SubscriptionService {
        &self.subscriptions
    }

    pub const fn webhooks(&self) -> &WebhookService {
        &self.webhooks
    }

    pub const fn agents(&self) -> &AgentService {
        &self.agents
    }

    pub const fn media(&self) -> &MediaService {
        &self.media
    }

    pub const fn workspace(&self) -> &WorkspaceService {
        &self.workspace
    }

    pub const fn settings(&self) -> &SettingsService {
        &self.settings
    }

    pub const fn maintenance(&self) -> &MaintenanceService {
        &self.maintenance
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }
}

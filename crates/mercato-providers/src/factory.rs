//! Wires configured provider clients into the core's [`Providers`] bundle.

use std::sync::Arc;

use mercato_core::{
    ConversionTrackerPort, NoopConversionTracker, ObjectStoragePort, Providers,
};
use tracing::info;

use crate::chat::ChatClient;
use crate::config::{ProvidersConfig, StorageConfig};
use crate::conversions::ConversionsClient;
use crate::error::ProviderResult;
use crate::http::{HttpBackend, ReqwestBackend};
use crate::payments::PaymentsClient;
use crate::storage::{LocalStorage, RemoteStorage};

/// Build every provider from configuration over one shared HTTP backend.
pub fn build_providers(config: &ProvidersConfig) -> ProviderResult<Providers> {
    let backend: Arc<dyn HttpBackend> = Arc::new(ReqwestBackend::new(&config.http)?);
    Ok(build_providers_with(config, backend))
}

/// Same as [`build_providers`] but over a caller-supplied backend.
pub fn build_providers_with(config: &ProvidersConfig, backend: Arc<dyn HttpBackend>) -> Providers {
    let storage: Arc<dyn ObjectStoragePort> = match &config.storage {
        StorageConfig::Local { dir, public_path } => {
            Arc::new(LocalStorage::new(dir.clone(), public_path.clone()))
        }
        StorageConfig::Remote { base_url, token } => Arc::new(RemoteStorage::new(
            backend.clone(),
            base_url.clone(),
            token.clone(),
        )),
    };

    let conversions: Arc<dyn ConversionTrackerPort> = if config.conversions.is_enabled() {
        Arc::new(ConversionsClient::new(backend.clone(), config.conversions.clone()))
    } else {
        Arc::new(NoopConversionTracker)
    };

    info!(
        payments = config.payments.secret_key.is_some(),
        webhooks = config.payments.webhook_secret.is_some(),
        chat = config.chat.api_key.is_some(),
        storage = storage.provider(),
        conversions = config.conversions.is_enabled(),
        "Providers configured"
    );

    Providers {
        payments: Arc::new(PaymentsClient::new(backend.clone(), config.payments.clone())),
        chat: Arc::new(ChatClient::new(backend, config.chat.clone())),
        storage,
        conversions,
    }
}

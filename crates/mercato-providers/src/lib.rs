//! Outbound provider clients for mercato.
//!
//! Implements the core's provider ports over HTTP: hosted checkout,
//! connected accounts and transfers, webhook verification, chat
//! completion, object storage and conversion tracking.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod chat;
mod config;
mod conversions;
mod error;
mod factory;
mod http;
mod payments;
mod storage;

// ============================================================================
// Public API
// ============================================================================

// Clients
pub use chat::ChatClient;
pub use conversions::ConversionsClient;
pub use payments::{PaymentsClient, sign as sign_webhook};
pub use storage::{LocalStorage, RemoteStorage};

// Configuration
pub use config::{
    ChatConfig, ConversionsConfig, DEFAULT_LOCAL_MEDIA_PATH, HttpConfig, PaymentsConfig,
    ProvidersConfig, ProvidersConfigError, StorageConfig,
};

// Errors
pub use error::ProviderHttpError;

// Transport
pub use http::{Body, HttpBackend, HttpRequest, HttpResponse, Method, ReqwestBackend};

// Composition
pub use factory::{build_providers, build_providers_with};

//! Public configuration for the provider clients.
//!
//! Every section has working defaults; credentials are optional so a
//! development server starts without any of them and only the calls that
//! need a missing credential fail.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PAYMENTS_API_BASE: &str = "https://api.stripe.com/v1";
pub const DEFAULT_CHAT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONVERSIONS_API_BASE: &str = "https://graph.facebook.com/v19.0";
/// URL path under which the server exposes locally stored media.
pub const DEFAULT_LOCAL_MEDIA_PATH: &str = "/media";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvidersConfigError {
    #[error("{key} must be one of {expected}, got '{value}'")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{key} is required when {because}")]
    Missing {
        key: &'static str,
        because: &'static str,
    },
}

/// Transport settings shared by every HTTP-backed client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Total attempts for a request that keeps failing transiently.
    pub max_attempts: u8,
    /// Delay before the first retry; doubled for each further retry.
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
            user_agent: concat!("mercato/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentsConfig {
    pub api_base: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    /// Maximum age of a signed webhook delivery.
    pub webhook_tolerance: Duration,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_PAYMENTS_API_BASE.to_string(),
            secret_key: None,
            webhook_secret: None,
            webhook_tolerance: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub api_base: String,
    pub api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_CHAT_API_BASE.to_string(),
            api_key: None,
        }
    }
}

/// Where uploaded media goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files under `dir`, served by the API server at `public_path`.
    Local { dir: PathBuf, public_path: String },
    /// An HTTP object store accepting `PUT`/`DELETE` on `{base_url}/{key}`.
    Remote {
        base_url: String,
        token: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            dir: PathBuf::from("data/uploads"),
            public_path: DEFAULT_LOCAL_MEDIA_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionsConfig {
    pub api_base: String,
    pub pixel_id: Option<String>,
    pub access_token: Option<String>,
}

impl Default for ConversionsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_CONVERSIONS_API_BASE.to_string(),
            pixel_id: None,
            access_token: None,
        }
    }
}

impl ConversionsConfig {
    /// Tracking is enabled only when both the pixel and the token are set.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.pixel_id.is_some() && self.access_token.is_some()
    }
}

/// Configuration for all provider clients.
///
/// # Example
///
/// ```
/// use mercato_providers::ProvidersConfig;
///
/// let config = ProvidersConfig::new()
///     .with_payments_secret("sk_test_123")
///     .with_webhook_secret("whsec_abc");
/// assert!(config.payments.secret_key.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidersConfig {
    pub http: HttpConfig,
    pub payments: PaymentsConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
    pub conversions: ConversionsConfig,
}

impl ProvidersConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_payments_secret(mut self, key: impl Into<String>) -> Self {
        self.payments.secret_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.payments.webhook_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_chat_key(mut self, key: impl Into<String>) -> Self {
        self.chat.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ProvidersConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProvidersConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(base) = get("PAYMENTS_API_BASE") {
            config.payments.api_base = base;
        }
        config.payments.secret_key = get("PAYMENTS_SECRET_KEY");
        config.payments.webhook_secret = get("PAYMENTS_WEBHOOK_SECRET");

        if let Some(base) = get("AI_API_BASE") {
            config.chat.api_base = base;
        }
        config.chat.api_key = get("AI_API_KEY");

        config.storage = match get("STORAGE_PROVIDER").as_deref() {
            None | Some("local") => StorageConfig::Local {
                dir: get("STORAGE_LOCAL_DIR").map_or_else(
                    || PathBuf::from("data/uploads"),
                    PathBuf::from,
                ),
                public_path: DEFAULT_LOCAL_MEDIA_PATH.to_string(),
            },
            Some("remote") => StorageConfig::Remote {
                base_url: get("STORAGE_REMOTE_URL").ok_or(ProvidersConfigError::Missing {
                    key: "STORAGE_REMOTE_URL",
                    because: "STORAGE_PROVIDER=remote",
                })?,
                token: get("STORAGE_REMOTE_TOKEN"),
            },
            Some(other) => {
                return Err(ProvidersConfigError::InvalidValue {
                    key: "STORAGE_PROVIDER",
                    value: other.to_string(),
                    expected: "local, remote",
                });
            }
        };

        config.conversions.pixel_id = get("CONVERSIONS_PIXEL_ID");
        config.conversions.access_token = get("CONVERSIONS_ACCESS_TOKEN");

        Ok(config)
    }
}

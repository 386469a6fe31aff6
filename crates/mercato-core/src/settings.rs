//! Platform settings and validation.
//!
//! Runtime-tunable values that admins can change without a redeploy.
//! They are persisted as a single JSON document by the settings repository.

use serde::{Deserialize, Serialize};

/// Default platform cut on released escrow payments (10%).
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 1_000;

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Marketplace-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformSettings {
    /// Platform fee in basis points taken from each released payment.
    pub platform_fee_bps: u32,

    /// ISO 4217 currency code (lowercase) for checkouts and transfers.
    pub currency: String,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,

    /// Model name sent to the chat-completion API for AI agents.
    pub ai_model: String,

    /// Number of prior messages replayed to the model on each turn.
    pub ai_max_history: u32,

    /// Pending missions older than this are cancelled by cleanup.
    pub stale_mission_days: u32,

    /// Lifetime of a login session.
    pub session_ttl_hours: u32,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PlatformSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            currency: "eur".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ai_model: "gpt-4o-mini".to_string(),
            ai_max_history: 20,
            stale_mission_days: 30,
            session_ttl_hours: 24 * 14,
        }
    }

    /// Merge an update into these settings, only touching fields that are set.
    pub fn merge(&mut self, update: &PlatformSettingsUpdate) {
        if let Some(fee) = update.platform_fee_bps {
            self.platform_fee_bps = fee;
        }
        if let Some(ref currency) = update.currency {
            self.currency = currency.trim().to_ascii_lowercase();
        }
        if let Some(max) = update.max_upload_bytes {
            self.max_upload_bytes = max;
        }
        if let Some(ref model) = update.ai_model {
            self.ai_model.clone_from(model);
        }
        if let Some(history) = update.ai_max_history {
            self.ai_max_history = history;
        }
        if let Some(days) = update.stale_mission_days {
            self.stale_mission_days = days;
        }
        if let Some(hours) = update.session_ttl_hours {
            self.session_ttl_hours = hours;
        }
    }
}

/// Partial settings update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettingsUpdate {
    pub platform_fee_bps: Option<u32>,
    pub currency: Option<String>,
    pub max_upload_bytes: Option<u64>,
    pub ai_model: Option<String>,
    pub ai_max_history: Option<u32>,
    pub stale_mission_days: Option<u32>,
    pub session_ttl_hours: Option<u32>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Platform fee must be at most 5000 bps (50%), got {0}")]
    InvalidPlatformFee(u32),

    #[error("Currency must be a three-letter ISO code, got '{0}'")]
    InvalidCurrency(String),

    #[error("Max upload size must be between 1 KiB and 100 MiB, got {0}")]
    InvalidUploadLimit(u64),

    #[error("AI model name cannot be empty")]
    EmptyAiModel,

    #[error("AI history must be between 1 and 200 messages, got {0}")]
    InvalidAiHistory(u32),

    #[error("Session lifetime must be between 1 and 2160 hours, got {0}")]
    InvalidSessionTtl(u32),

    #[error("Stale mission threshold must be between 1 and 3650 days, got {0}")]
    InvalidStaleMissionDays(u32),
}

/// Upper bound for `stale_mission_days`, ten years.
pub const MAX_STALE_MISSION_DAYS: u32 = 3_650;

/// Validate settings values.
pub fn validate_settings(settings: &PlatformSettings) -> Result<(), SettingsError> {
    if settings.platform_fee_bps > 5_000 {
        return Err(SettingsError::InvalidPlatformFee(settings.platform_fee_bps));
    }

    if settings.currency.len() != 3 || !settings.currency.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(SettingsError::InvalidCurrency(settings.currency.clone()));
    }

    if !(1024..=100 * 1024 * 1024).contains(&settings.max_upload_bytes) {
        return Err(SettingsError::InvalidUploadLimit(settings.max_upload_bytes));
    }

    if settings.ai_model.trim().is_empty() {
        return Err(SettingsError::EmptyAiModel);
    }

    if !(1..=200).contains(&settings.ai_max_history) {
        return Err(SettingsError::InvalidAiHistory(settings.ai_max_history));
    }

    if !(1..=2160).contains(&settings.session_ttl_hours) {
        return Err(SettingsError::InvalidSessionTtl(settings.session_ttl_hours));
    }

    if !(1..=MAX_STALE_MISSION_DAYS).contains(&settings.stale_mission_days) {
        return Err(SettingsError::InvalidStaleMissionDays(
            settings.stale_mission_days,
        ));
    }

    Ok(())
}

//! Settings repository trait definition.
//!
//! This port defines the interface for platform settings persistence.

use async_trait::async_trait;

use super::RepositoryError;
use crate::settings::PlatformSettings;

/// Repository for platform settings persistence.
///
/// Settings are stored and retrieved as a whole; the implementation
/// handles serialization.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load platform settings.
    ///
    /// Returns default settings if none are stored.
    async fn load(&self) -> Result<PlatformSettings, RepositoryError>;

    /// Save platform settings.
    async fn save(&self, settings: &PlatformSettings) -> Result<(), RepositoryError>;
}

//! Conversion tracking port.
//!
//! Tracking is fire-and-forget: callers log failures and carry on.

use async_trait::async_trait;

use super::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionEvent {
    /// Event name, e.g. `CompleteRegistration` or `Purchase`.
    pub name: String,
    /// Stable id used by the provider to deduplicate.
    pub event_id: String,
    pub email: Option<String>,
    pub value_cents: Option<i64>,
    pub currency: Option<String>,
}

#[async_trait]
pub trait ConversionTrackerPort: Send + Sync {
    async fn track(&self, event: &ConversionEvent) -> Result<(), ProviderError>;
}

/// Tracker used when no pixel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConversionTracker;

#[async_trait]
impl ConversionTrackerPort for NoopConversionTracker {
    async fn track(&self, _event: &ConversionEvent) -> Result<(), ProviderError> {
        Ok(())
    }
}

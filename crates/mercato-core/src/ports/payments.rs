//! Payment gateway port.
//!
//! Covers hosted checkout (one-off and subscription), connected payout
//! accounts, transfers out of the platform balance, and verification of
//! inbound webhook deliveries.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::ProviderError;

/// Whether a checkout collects a single payment or starts a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub mode: CheckoutMode,
    /// Inline amount for `Payment` mode.
    pub amount_cents: Option<i64>,
    pub currency: String,
    pub description: String,
    /// Recurring price for `Subscription` mode.
    pub price_id: Option<String>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Echoed back verbatim on the completion webhook.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub destination: String,
    pub transfer_group: String,
    /// Stable per payment, so a repeated request cannot pay out twice.
    pub idempotency_key: String,
}

/// A verified webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub event: PaymentEvent,
}

/// The webhook payloads the marketplace reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    CheckoutCompleted {
        session_id: String,
        customer_id: Option<String>,
        amount_total: Option<i64>,
        currency: Option<String>,
        metadata: BTreeMap<String, String>,
    },
    SubscriptionDeleted {
        customer_id: String,
    },
    InvoicePaymentFailed {
        customer_id: String,
    },
    AccountUpdated {
        account_id: String,
        payouts_enabled: bool,
    },
    /// Anything else; acknowledged and ignored.
    Other {
        event_type: String,
    },
}

#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Create a connected account for payouts, returning its id.
    async fn create_connected_account(&self, email: &str) -> Result<String, ProviderError>;

    /// Create a hosted onboarding link for a connected account.
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, ProviderError>;

    /// Move funds to a connected account, returning the transfer id.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError>;

    /// Verify a webhook signature header and decode the payload.
    ///
    /// Returns `Err(ProviderError::InvalidSignature)` when the header is
    /// missing, malformed, stale or does not match.
    fn parse_webhook(&self, payload: &[u8], signature: &str)
    -> Result<WebhookEvent, ProviderError>;
}

//! Dispatch of verified payment-provider webhooks.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::SubscriptionTier;
use crate::ports::{CoreError, PaymentEvent, PaymentGatewayPort};

use super::escrow_service::{EscrowService, KIND_MISSION, METADATA_KIND, METADATA_MISSION_ID};
use super::subscription_service::{
    KIND_SUBSCRIPTION, METADATA_TIER, METADATA_USER_ID, SubscriptionService,
};

/// What a delivery changed. Useful for logs and tests; the HTTP response
/// is the same for every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    MissionFunded { mission_id: i64, payment_id: i64 },
    DuplicateDelivery,
    SubscriptionActivated { user_id: i64 },
    SubscriptionPastDue,
    SubscriptionCanceled,
    PayoutAccountUpdated,
    Ignored,
}

pub struct WebhookService {
    gateway: Arc<dyn PaymentGatewayPort>,
    escrow: EscrowService,
    subscriptions: SubscriptionService,
}

impl WebhookService {
    pub fn new(
        gateway: Arc<dyn PaymentGatewayPort>,
        escrow: EscrowService,
        subscriptions: SubscriptionService,
    ) -> Self {
        Self {
            gateway,
            escrow,
            subscriptions,
        }
    }

    /// Verify and apply one webhook delivery.
    ///
    /// Signature failures surface as `CoreError::Provider(InvalidSignature)`.
    /// Events we do not act on are acknowledged as `Ignored`.
    pub async fn handle(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, CoreError> {
        let event = self.gateway.parse_webhook(payload, signature)?;
        debug!(event_id = %event.id, "Webhook verified");

        match event.event {
            PaymentEvent::CheckoutCompleted {
                session_id,
                customer_id,
                amount_total,
                currency,
                metadata,
            } => {
                self.checkout_completed(
                    &session_id,
                    customer_id.as_deref(),
                    amount_total,
                    currency.as_deref(),
                    &metadata,
                )
                .await
            }
            PaymentEvent::InvoicePaymentFailed { customer_id } => {
                Ok(if self.subscriptions.mark_past_due(&customer_id).await? {
                    WebhookOutcome::SubscriptionPastDue
                } else {
                    WebhookOutcome::Ignored
                })
            }
            PaymentEvent::SubscriptionDeleted { customer_id } => {
                Ok(if self.subscriptions.cancel(&customer_id).await? {
                    WebhookOutcome::SubscriptionCanceled
                } else {
                    WebhookOutcome::Ignored
                })
            }
            PaymentEvent::AccountUpdated {
                account_id,
                payouts_enabled,
            } => Ok(
                if self
                    .escrow
                    .payout_account_updated(&account_id, payouts_enabled)
                    .await?
                {
                    WebhookOutcome::PayoutAccountUpdated
                } else {
                    WebhookOutcome::Ignored
                },
            ),
            PaymentEvent::Other { event_type } => {
                debug!(event_type = %event_type, "Ignoring webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn checkout_completed(
        &self,
        session_id: &str,
        customer_id: Option<&str>,
        amount_total: Option<i64>,
        currency: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> Result<WebhookOutcome, CoreError> {
        match metadata.get(METADATA_KIND).map(String::as_str) {
            Some(KIND_MISSION) => {
                let Some(mission_id) = parse_id(metadata, METADATA_MISSION_ID) else {
                    warn!(session_id, "Mission checkout without a mission id");
                    return Ok(WebhookOutcome::Ignored);
                };
                let recorded = self
                    .escrow
                    .record_checkout(mission_id, session_id, amount_total, currency)
                    .await?;
                Ok(recorded.map_or(WebhookOutcome::DuplicateDelivery, |payment| {
                    WebhookOutcome::MissionFunded {
                        mission_id,
                        payment_id: payment.id,
                    }
                }))
            }
            Some(KIND_SUBSCRIPTION) => {
                let user_id = parse_id(metadata, METADATA_USER_ID);
                let tier = metadata
                    .get(METADATA_TIER)
                    .and_then(|t| SubscriptionTier::parse(t));
                let (Some(user_id), Some(tier)) = (user_id, tier) else {
                    warn!(session_id, "Subscription checkout with incomplete metadata");
                    return Ok(WebhookOutcome::Ignored);
                };
                self.subscriptions
                    .activate(user_id, tier, customer_id)
                    .await?;
                Ok(WebhookOutcome::SubscriptionActivated { user_id })
            }
            other => {
                info!(session_id, kind = ?other, "Checkout with unknown kind ignored");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}

fn parse_id(metadata: &BTreeMap<String, String>, key: &str) -> Option<i64> {
    metadata.get(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let metadata = BTreeMap::from([
            ("mission_id".to_string(), "17".to_string()),
            ("user_id".to_string(), "abc".to_string()),
        ]);
        assert_eq!(parse_id(&metadata, "mission_id"), Some(17));
        assert_eq!(parse_id(&metadata, "user_id"), None);
        assert_eq!(parse_id(&metadata, "tier"), None);
    }
}

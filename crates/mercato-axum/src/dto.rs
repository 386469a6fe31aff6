//! Request and response shapes that exist only at the HTTP edge.

use mercato_core::{CheckoutSession, MissionParty, VerificationStatus, WebhookOutcome};
use serde::{Deserialize, Serialize};

/// A hosted checkout the client should be redirected to.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            session_id: session.id,
            url: session.url,
        }
    }
}

/// Payout onboarding link.
#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub url: String,
}

/// Acknowledgement returned to the payments provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

impl From<&WebhookOutcome> for WebhookAck {
    fn from(outcome: &WebhookOutcome) -> Self {
        let outcome = match outcome {
            WebhookOutcome::MissionFunded { .. } => "mission_funded",
            WebhookOutcome::DuplicateDelivery => "duplicate",
            WebhookOutcome::SubscriptionActivated { .. } => "subscription_activated",
            WebhookOutcome::SubscriptionPastDue => "subscription_past_due",
            WebhookOutcome::SubscriptionCanceled => "subscription_canceled",
            WebhookOutcome::PayoutAccountUpdated => "payout_account_updated",
            WebhookOutcome::Ignored => "ignored",
        };
        Self {
            received: true,
            outcome,
        }
    }
}

/// `GET /missions?as=client|freelancer`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MissionListQuery {
    #[serde(rename = "as")]
    pub party: MissionParty,
}

/// `GET /workspace/{tasks|time-entries}?project_id=`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFilter {
    pub project_id: Option<i64>,
}

/// Admin verification decision.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VerificationDecision {
    pub status: VerificationStatus,
}

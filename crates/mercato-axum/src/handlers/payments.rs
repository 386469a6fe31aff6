//! Payment handlers - payout onboarding, subscriptions and the provider webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use mercato_core::SubscriptionCheckout;
use tracing::info;

use crate::auth::CurrentUser;
use crate::dto::{CheckoutResponse, OnboardingResponse, WebhookAck};
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Header carrying the webhook signature (`t=..,v1=..`).
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Create (or reuse) the caller's payout account and return an onboarding link.
pub async fn connect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<OnboardingResponse>, HttpError> {
    let url = state.core.escrow().connect_payouts(&user).await?;
    Ok(Json(OnboardingResponse { url }))
}

pub async fn subscription_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SubscriptionCheckout>,
) -> Result<Json<CheckoutResponse>, HttpError> {
    let session = state.core.subscriptions().checkout(&user, req.tier).await?;
    Ok(Json(session.into()))
}

/// Verify and apply a provider webhook. The raw body is needed for the
/// signature, so it is taken as bytes.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, HttpError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;

    let outcome = state.core.webhooks().handle(&body, signature).await?;
    info!(outcome = ?outcome, "Payment webhook processed");
    Ok(Json(WebhookAck::from(&outcome)))
}

//! Paid listing tiers backed by provider subscriptions.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MarketplaceConfig;
use crate::domain::{SubscriptionStatus, SubscriptionTier, User};
use crate::ports::{
    BusinessRepository, CheckoutMode, CheckoutRequest, CheckoutSession, CoreError,
    PaymentGatewayPort, SettingsRepository, UserRepository,
};

use super::escrow_service::METADATA_KIND;

/// `kind` value for subscription checkouts.
pub const KIND_SUBSCRIPTION: &str = "subscription";
pub const METADATA_USER_ID: &str = "user_id";
pub const METADATA_TIER: &str = "tier";

#[derive(Clone)]
pub struct SubscriptionService {
    users: Arc<dyn UserRepository>,
    businesses: Arc<dyn BusinessRepository>,
    settings: Arc<dyn SettingsRepository>,
    gateway: Arc<dyn PaymentGatewayPort>,
    config: Arc<MarketplaceConfig>,
}

impl SubscriptionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        businesses: Arc<dyn BusinessRepository>,
        settings: Arc<dyn SettingsRepository>,
        gateway: Arc<dyn PaymentGatewayPort>,
        config: Arc<MarketplaceConfig>,
    ) -> Self {
        Self {
            users,
            businesses,
            settings,
            gateway,
            config,
        }
    }

    /// Start a subscription checkout for a paid tier.
    pub async fn checkout(
        &self,
        user: &User,
        tier: SubscriptionTier,
    ) -> Result<CheckoutSession, CoreError> {
        if tier == SubscriptionTier::Free {
            return Err(CoreError::invalid("tier", "must be PRO or PREMIUM"));
        }
        let price_id = self.config.price_for(tier).ok_or_else(|| {
            CoreError::Configuration(format!("no subscription price configured for {tier}"))
        })?;
        let settings = self.settings.load().await?;

        let request = CheckoutRequest {
            mode: CheckoutMode::Subscription,
            amount_cents: None,
            currency: settings.currency,
            description: format!("Mercato {tier} plan"),
            price_id: Some(price_id.to_string()),
            customer_email: Some(user.email.clone()),
            success_url: self.config.url("/account/subscription?status=success"),
            cancel_url: self.config.url("/account/subscription?status=cancelled"),
            metadata: BTreeMap::from([
                (METADATA_KIND.to_string(), KIND_SUBSCRIPTION.to_string()),
                (METADATA_USER_ID.to_string(), user.id.to_string()),
                (METADATA_TIER.to_string(), tier.as_str().to_string()),
            ]),
        };
        let session = self.gateway.create_checkout_session(&request).await?;
        info!(user_id = user.id, tier = %tier, session_id = %session.id, "Subscription checkout created");
        Ok(session)
    }

    /// Activate a subscription after a completed checkout.
    pub async fn activate(
        &self,
        user_id: i64,
        tier: SubscriptionTier,
        customer_id: Option<&str>,
    ) -> Result<(), CoreError> {
        self.users
            .set_subscription(user_id, SubscriptionStatus::Active, Some(tier), customer_id)
            .await?;
        if let Some(business) = self.businesses.find_by_owner(user_id).await? {
            self.businesses.set_tier(business.id, tier).await?;
        }
        info!(user_id, tier = %tier, "Subscription activated");
        Ok(())
    }

    /// Flag the customer's subscription as past due. Returns whether a user matched.
    pub async fn mark_past_due(&self, customer_id: &str) -> Result<bool, CoreError> {
        let Some(user) = self.users.find_by_customer_id(customer_id).await? else {
            debug!(customer_id, "Payment failure for unknown customer");
            return Ok(false);
        };
        self.users
            .set_subscription(
                user.id,
                SubscriptionStatus::PastDue,
                user.subscription_plan,
                None,
            )
            .await?;
        info!(user_id = user.id, "Subscription past due");
        Ok(true)
    }

    /// End the customer's subscription and drop their listing to `FREE`.
    pub async fn cancel(&self, customer_id: &str) -> Result<bool, CoreError> {
        let Some(user) = self.users.find_by_customer_id(customer_id).await? else {
            debug!(customer_id, "Cancellation for unknown customer");
            return Ok(false);
        };
        self.users
            .set_subscription(user.id, SubscriptionStatus::Canceled, None, None)
            .await?;
        if let Some(business) = self.businesses.find_by_owner(user.id).await? {
            self.businesses
                .set_tier(business.id, SubscriptionTier::Free)
                .await?;
        }
        info!(user_id = user.id, "Subscription canceled");
        Ok(true)
    }
}

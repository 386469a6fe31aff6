//! Escrow payment flow for missions.
//!
//! Funds are collected through a hosted checkout and held on the platform
//! balance. Nothing is written locally until the provider confirms the
//! checkout; release transfers the amount minus the platform fee to the
//! freelancer's connected account.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::MarketplaceConfig;
use crate::domain::{
    MissionRequest, MissionStatus, NewPayment, Payment, User, UserRole, platform_fee,
};
use crate::ports::{
    BusinessRepository, CheckoutMode, CheckoutRequest, CheckoutSession, CoreError,
    MissionRepository, PaymentGatewayPort, PaymentRepository, RepositoryError, SettingsRepository,
    TransferRequest, UserRepository,
};

/// Metadata key identifying what a checkout pays for.
pub const METADATA_KIND: &str = "kind";
/// `kind` value for mission escrow checkouts.
pub const KIND_MISSION: &str = "mission";
/// Metadata key carrying the mission id.
pub const METADATA_MISSION_ID: &str = "mission_id";

#[derive(Clone)]
pub struct EscrowService {
    missions: Arc<dyn MissionRepository>,
    payments: Arc<dyn PaymentRepository>,
    businesses: Arc<dyn BusinessRepository>,
    users: Arc<dyn UserRepository>,
    settings: Arc<dyn SettingsRepository>,
    gateway: Arc<dyn PaymentGatewayPort>,
    config: Arc<MarketplaceConfig>,
}

impl EscrowService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        missions: Arc<dyn MissionRepository>,
        payments: Arc<dyn PaymentRepository>,
        businesses: Arc<dyn BusinessRepository>,
        users: Arc<dyn UserRepository>,
        settings: Arc<dyn SettingsRepository>,
        gateway: Arc<dyn PaymentGatewayPort>,
        config: Arc<MarketplaceConfig>,
    ) -> Self {
        Self {
            missions,
            payments,
            businesses,
            users,
            settings,
            gateway,
            config,
        }
    }

    /// Start a checkout for a pending mission. Client only.
    pub async fn request_payment(
        &self,
        user: &User,
        mission_id: i64,
    ) -> Result<CheckoutSession, CoreError> {
        let mission = self.client_mission(user, mission_id).await?;
        if mission.status != MissionStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "a {} mission cannot be paid",
                mission.status
            )));
        }
        self.businesses.get_by_id(mission.business_id).await?;

        let settings = self.settings.load().await?;
        let request = mission_checkout(&mission, &settings.currency, &self.config);
        let session = self.gateway.create_checkout_session(&request).await?;
        info!(mission_id, session_id = %session.id, "Mission checkout created");
        Ok(session)
    }

    /// Record a confirmed mission checkout as a held payment.
    ///
    /// Returns `Ok(None)` when the session was already recorded.
    pub async fn record_checkout(
        &self,
        mission_id: i64,
        session_id: &str,
        amount_total: Option<i64>,
        currency: Option<&str>,
    ) -> Result<Option<Payment>, CoreError> {
        let mission = self.missions.get_by_id(mission_id).await?;
        let settings = self.settings.load().await?;
        let amount_cents = amount_total.unwrap_or(mission.budget_cents);

        let inserted = self
            .payments
            .insert_held(&NewPayment {
                mission_id,
                amount_cents,
                platform_fee_cents: platform_fee(amount_cents, settings.platform_fee_bps),
                currency: currency.map_or(settings.currency, str::to_ascii_lowercase),
                checkout_session_id: session_id.to_string(),
            })
            .await;

        let payment = match inserted {
            Ok(payment) => payment,
            Err(RepositoryError::AlreadyExists(_)) => {
                info!(mission_id, session_id, "Duplicate checkout delivery ignored");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        // A confirmed checkout reopens a cancelled mission; held funds must stay releasable.
        match mission.status {
            MissionStatus::Pending | MissionStatus::Cancelled => {
                if mission.status == MissionStatus::Cancelled {
                    warn!(mission_id, "Checkout confirmed for a cancelled mission, reopening it");
                }
                self.missions
                    .set_status(mission_id, MissionStatus::InProgress)
                    .await?;
            }
            status => {
                warn!(mission_id, %status, "Payment held for a mission already under way");
            }
        }
        info!(
            mission_id,
            payment_id = payment.id,
            amount_cents = payment.amount_cents,
            fee_cents = payment.platform_fee_cents,
            "Escrow payment held"
        );
        Ok(Some(payment))
    }

    /// Release held funds to the freelancer and complete the mission. Client only.
    pub async fn release(&self, user: &User, mission_id: i64) -> Result<Payment, CoreError> {
        let mission = self.client_mission(user, mission_id).await?;
        if !mission.status.allows_release() {
            return Err(CoreError::Conflict(format!(
                "funds cannot be released for a {} mission",
                mission.status
            )));
        }

        let held = self
            .payments
            .find_held(mission_id)
            .await?
            .ok_or_else(|| CoreError::Conflict("mission has no held payment".to_string()))?;

        let business = self.businesses.get_by_id(mission.business_id).await?;
        let freelancer = self.users.get_by_id(business.owner_id).await?;
        let destination = freelancer
            .payout_account_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CoreError::Conflict("freelancer has no connected payout account".to_string())
            })?;

        let transfer_id = self
            .gateway
            .create_transfer(&TransferRequest {
                amount_cents: held.payout_cents(),
                currency: held.currency.clone(),
                destination,
                transfer_group: format!("mission-{mission_id}"),
                idempotency_key: payout_idempotency_key(held.id),
            })
            .await?;

        let released = self
            .payments
            .mark_released(held.id, &transfer_id, Utc::now())
            .await?;
        self.missions
            .set_status(mission_id, MissionStatus::Completed)
            .await?;

        info!(
            mission_id,
            payment_id = released.id,
            transfer_id = %transfer_id,
            payout_cents = released.payout_cents(),
            "Escrow released"
        );
        Ok(released)
    }

    /// Connected-account onboarding link for a freelancer.
    ///
    /// The account is created on first use and remembered on the user.
    pub async fn connect_payouts(&self, user: &User) -> Result<String, CoreError> {
        if user.role != UserRole::Freelancer {
            return Err(CoreError::Forbidden(
                "only freelancers can receive payouts".to_string(),
            ));
        }

        let account_id = match user.payout_account_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = self.gateway.create_connected_account(&user.email).await?;
                self.users.set_payout_account(user.id, &id).await?;
                info!(user_id = user.id, account_id = %id, "Connected account created");
                id
            }
        };

        self.gateway
            .create_account_link(
                &account_id,
                &self.config.url("/payouts/refresh"),
                &self.config.url("/payouts/return"),
            )
            .await
            .map_err(CoreError::from)
    }

    /// Mirror the provider's payout capability onto the owning user.
    pub async fn payout_account_updated(
        &self,
        account_id: &str,
        payouts_enabled: bool,
    ) -> Result<bool, CoreError> {
        match self.users.find_by_payout_account(account_id).await? {
            Some(user) => {
                self.users
                    .set_payouts_enabled(user.id, payouts_enabled)
                    .await?;
                info!(user_id = user.id, payouts_enabled, "Payout capability updated");
                Ok(true)
            }
            None => {
                debug!(account_id, "Account update for unknown account");
                Ok(false)
            }
        }
    }

    async fn client_mission(&self, user: &User, id: i64) -> Result<MissionRequest, CoreError> {
        let mission = self.missions.get_by_id(id).await?;
        if mission.client_id != user.id {
            return Err(CoreError::Forbidden(
                "only the mission's client can manage its payment".to_string(),
            ));
        }
        Ok(mission)
    }
}

fn payout_idempotency_key(payment_id: i64) -> String {
    format!("payout-{payment_id}")
}

fn mission_checkout(
    mission: &MissionRequest,
    currency: &str,
    config: &MarketplaceConfig,
) -> CheckoutRequest {
    let metadata = BTreeMap::from([
        (METADATA_KIND.to_string(), KIND_MISSION.to_string()),
        (METADATA_MISSION_ID.to_string(), mission.id.to_string()),
    ]);
    CheckoutRequest {
        mode: CheckoutMode::Payment,
        amount_cents: Some(mission.budget_cents),
        currency: currency.to_string(),
        description: format!("Mission #{}: {}", mission.id, mission.title),
        price_id: None,
        customer_email: Some(mission.client_email.clone()),
        success_url: config.url(&format!("/missions/{}?payment=success", mission.id)),
        cancel_url: config.url(&format!("/missions/{}?payment=cancelled", mission.id)),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_checkout_carries_metadata_and_amount() {
        let now = Utc::now();
        let mission = MissionRequest {
            id: 42,
            business_id: 1,
            client_id: 2,
            client_email: "client@example.com".into(),
            client_name: None,
            title: "Website".into(),
            description: "Landing page".into(),
            budget_cents: 120_000,
            status: MissionStatus::Pending,
            deadline: None,
            created_at: now,
            updated_at: now,
        };
        let config = MarketplaceConfig::new("https://mercato.example");

        let request = mission_checkout(&mission, "eur", &config);

        assert_eq!(request.mode, CheckoutMode::Payment);
        assert_eq!(request.amount_cents, Some(120_000));
        assert_eq!(request.metadata.get("kind").map(String::as_str), Some("mission"));
        assert_eq!(request.metadata.get("mission_id").map(String::as_str), Some("42"));
        assert_eq!(
            request.success_url,
            "https://mercato.example/missions/42?payment=success"
        );
    }

    #[test]
    fn test_payout_key_is_stable_per_payment() {
        assert_eq!(payout_idempotency_key(7), payout_idempotency_key(7));
        assert_ne!(payout_idempotency_key(7), payout_idempotency_key(8));
    }

    #[test]
    fn test_fee_split() {
        assert_eq!(platform_fee(120_000, 1_000), 12_000);
        assert_eq!(platform_fee(999, 1_000), 99);
    }
}

//! User accounts and sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::business::SubscriptionTier;

string_enum! {
    /// What a user does on the marketplace.
    pub enum UserRole {
        Client => "CLIENT",
        Freelancer => "FREELANCER",
        /// Only assignable from the maintenance CLI.
        Admin => "ADMIN",
    }
}

string_enum! {
    /// Mirror of the payment provider's subscription state.
    pub enum SubscriptionStatus {
        Inactive => "INACTIVE",
        Active => "ACTIVE",
        PastDue => "PAST_DUE",
        Canceled => "CANCELED",
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan: Option<SubscriptionTier>,
    pub payments_customer_id: Option<String>,
    pub payout_account_id: Option<String>,
    pub payouts_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may act on marketplace-wide admin endpoints.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Data for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
}

/// Data for inserting a session. Only the token hash is persisted.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Registration request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<UserRole>,
}

/// Login request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Result of a successful login or registration.
///
/// `token` is the only time the raw bearer token leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Body of a subscription checkout request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SubscriptionCheckout {
    pub tier: SubscriptionTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_storage_form() {
        for role in [UserRole::Client, UserRole::Freelancer, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("client"), None);
    }

    #[test]
    fn test_subscription_status_serializes_screaming_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"PAST_DUE\"");
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            email: "a@b.co".into(),
            password_hash: "secret-hash".into(),
            name: "A".into(),
            role: UserRole::Client,
            subscription_status: SubscriptionStatus::Inactive,
            subscription_plan: None,
            payments_customer_id: None,
            payout_account_id: None,
            payouts_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "CLIENT");
    }
}

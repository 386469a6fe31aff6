//! User and session repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::{NewSession, NewUser, SubscriptionStatus, SubscriptionTier, User, UserRole};

/// Repository for user accounts.
///
/// # Design Rules
///
/// - Emails are stored normalized; lookups expect a normalized email
/// - Subscription and payout fields are only written through the
///   dedicated setters, never through a full-row update
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user.
    ///
    /// Returns `Err(RepositoryError::AlreadyExists)` if the email is taken.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    /// Find the user linked to a payment-provider customer.
    async fn find_by_customer_id(&self, customer_id: &str)
    -> Result<Option<User>, RepositoryError>;

    /// Find the user owning a connected payout account.
    async fn find_by_payout_account(
        &self,
        account_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    async fn set_role(&self, id: i64, role: UserRole) -> Result<(), RepositoryError>;

    /// Overwrite subscription fields. `customer_id` is only written when `Some`.
    async fn set_subscription(
        &self,
        id: i64,
        status: SubscriptionStatus,
        plan: Option<SubscriptionTier>,
        customer_id: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn set_payout_account(&self, id: i64, account_id: &str) -> Result<(), RepositoryError>;

    async fn set_payouts_enabled(&self, id: i64, enabled: bool) -> Result<(), RepositoryError>;
}

/// Repository for login sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &NewSession) -> Result<(), RepositoryError>;

    /// Resolve a token hash to its user if the session has not expired at `now`.
    async fn find_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Delete a session. Deleting an unknown session is not an error.
    async fn delete(&self, token_hash: &str) -> Result<(), RepositoryError>;

    /// Count sessions that expired before `now`.
    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;

    /// Delete sessions that expired before `now`, returning how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

//! Mission and escrow payment repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::{
    MissionMessage, MissionRequest, MissionStatus, NewMission, NewPayment, Payment,
};

/// Repository for mission requests and their message threads.
#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn insert(&self, mission: &NewMission) -> Result<MissionRequest, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<MissionRequest, RepositoryError>;

    async fn list_for_client(&self, client_id: i64)
    -> Result<Vec<MissionRequest>, RepositoryError>;

    async fn list_for_business(
        &self,
        business_id: i64,
    ) -> Result<Vec<MissionRequest>, RepositoryError>;

    async fn set_status(&self, id: i64, status: MissionStatus) -> Result<(), RepositoryError>;

    /// Pending missions created before `before`, oldest first.
    async fn list_stale_pending(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<MissionRequest>, RepositoryError>;

    async fn add_message(
        &self,
        mission_id: i64,
        sender_id: i64,
        body: &str,
    ) -> Result<MissionMessage, RepositoryError>;

    async fn list_messages(&self, mission_id: i64) -> Result<Vec<MissionMessage>, RepositoryError>;
}

/// Repository for escrow payment records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Record a confirmed checkout as a `HELD` payment.
    ///
    /// Returns `Err(RepositoryError::AlreadyExists)` if the checkout session
    /// was already recorded, which makes webhook redelivery harmless.
    async fn insert_held(&self, payment: &NewPayment) -> Result<Payment, RepositoryError>;

    /// Most recent payment for a mission, in any state.
    async fn latest_for_mission(&self, mission_id: i64)
    -> Result<Option<Payment>, RepositoryError>;

    async fn find_held(&self, mission_id: i64) -> Result<Option<Payment>, RepositoryError>;

    /// Mark a held payment as released with the provider's transfer id.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if no `HELD` payment with
    /// that id exists.
    async fn mark_released(
        &self,
        id: i64,
        transfer_id: &str,
        released_at: DateTime<Utc>,
    ) -> Result<Payment, RepositoryError>;
}

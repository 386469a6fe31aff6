//! `SQLite` implementations of the mission and escrow payment repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use mercato_core::{
    MissionMessage, MissionRepository, MissionRequest, MissionStatus, NewMission, NewPayment,
    Payment, PaymentRepository, PaymentStatus, RepositoryError,
};

use super::row_mappers::{
    MISSION_MESSAGE_SELECT_COLUMNS, MISSION_SELECT_COLUMNS, PAYMENT_SELECT_COLUMNS, now,
    row_to_mission, row_to_mission_message, row_to_payment, storage, ts, write_error,
};

/// `SQLite` implementation of the `MissionRepository` trait.
pub struct SqliteMissionRepository {
    pool: SqlitePool,
}

impl SqliteMissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        condition: &str,
        value: i64,
    ) -> Result<Vec<MissionRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MISSION_SELECT_COLUMNS} FROM missions WHERE {condition} ORDER BY created_at DESC, id DESC"
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_mission).collect()
    }
}

#[async_trait]
impl MissionRepository for SqliteMissionRepository {
    async fn insert(&self, mission: &NewMission) -> Result<MissionRequest, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            r"INSERT INTO missions
              (business_id, client_id, client_email, client_name, title, description,
               budget_cents, status, deadline, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(mission.business_id)
        .bind(mission.client_id)
        .bind(&mission.client_email)
        .bind(&mission.client_name)
        .bind(&mission.title)
        .bind(&mission.description)
        .bind(mission.budget_cents)
        .bind(MissionStatus::Pending.as_str())
        .bind(mission.deadline.map(ts))
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "mission"))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn get_by_id(&self, id: i64) -> Result<MissionRequest, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MISSION_SELECT_COLUMNS} FROM missions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("mission {id}")))?;

        row_to_mission(&row)
    }

    async fn list_for_client(
        &self,
        client_id: i64,
    ) -> Result<Vec<MissionRequest>, RepositoryError> {
        self.list_where("client_id = ?", client_id).await
    }

    async fn list_for_business(
        &self,
        business_id: i64,
    ) -> Result<Vec<MissionRequest>, RepositoryError> {
        self.list_where("business_id = ?", business_id).await
    }

    async fn set_status(&self, id: i64, status: MissionStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE missions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("mission {id}")));
        }
        Ok(())
    }

    async fn list_stale_pending(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<MissionRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MISSION_SELECT_COLUMNS} FROM missions WHERE status = 'PENDING' AND created_at < ? ORDER BY created_at"
        ))
        .bind(ts(before))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_mission).collect()
    }

    async fn add_message(
        &self,
        mission_id: i64,
        sender_id: i64,
        body: &str,
    ) -> Result<MissionMessage, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO mission_messages (mission_id, sender_id, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(mission_id)
        .bind(sender_id)
        .bind(body)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "mission message"))?;

        let row = sqlx::query(&format!(
            "SELECT {MISSION_MESSAGE_SELECT_COLUMNS} FROM mission_messages WHERE id = ?"
        ))
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        row_to_mission_message(&row)
    }

    async fn list_messages(&self, mission_id: i64) -> Result<Vec<MissionMessage>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MISSION_MESSAGE_SELECT_COLUMNS} FROM mission_messages WHERE mission_id = ? ORDER BY created_at, id"
        ))
        .bind(mission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_mission_message).collect()
    }
}

/// `SQLite` implementation of the `PaymentRepository` trait.
///
/// `checkout_session_id` is unique, which makes webhook redelivery
/// surface as `RepositoryError::AlreadyExists`.
pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_by_id(&self, id: i64) -> Result<Payment, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_SELECT_COLUMNS} FROM payments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("payment {id}")))?;

        row_to_payment(&row)
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn insert_held(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        let result = sqlx::query(
            r"INSERT INTO payments
              (mission_id, amount_cents, platform_fee_cents, currency, status, checkout_session_id, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payment.mission_id)
        .bind(payment.amount_cents)
        .bind(payment.platform_fee_cents)
        .bind(&payment.currency)
        .bind(PaymentStatus::Held.as_str())
        .bind(&payment.checkout_session_id)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                &format!("payment for session {}", payment.checkout_session_id),
            )
        })?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn latest_for_mission(
        &self,
        mission_id: i64,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_SELECT_COLUMNS} FROM payments WHERE mission_id = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(mission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_payment).transpose()
    }

    async fn find_held(&self, mission_id: i64) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_SELECT_COLUMNS} FROM payments WHERE mission_id = ? AND status = 'HELD' ORDER BY id DESC LIMIT 1"
        ))
        .bind(mission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_payment).transpose()
    }

    async fn mark_released(
        &self,
        id: i64,
        transfer_id: &str,
        released_at: DateTime<Utc>,
    ) -> Result<Payment, RepositoryError> {
        let result = sqlx::query(
            "UPDATE payments SET status = ?, transfer_id = ?, released_at = ? WHERE id = ? AND status = 'HELD'",
        )
        .bind(PaymentStatus::Released.as_str())
        .bind(transfer_id)
        .bind(ts(released_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("held payment {id}")));
        }
        self.get_by_id(id).await
    }
}

//! `SQLite` implementations of the user and session repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use mercato_core::{
    NewSession, NewUser, RepositoryError, SessionRepository, SubscriptionStatus,
    SubscriptionTier, User, UserRepository, UserRole,
};

use super::row_mappers::{USER_SELECT_COLUMNS, now, row_to_user, storage, ts, write_error};

/// `SQLite` implementation of the `UserRepository` trait.
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_by(&self, column: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_SELECT_COLUMNS} FROM users WHERE {column} = ?"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_user).transpose()
    }

    fn expect_updated(id: i64, rows: u64) -> Result<(), RepositoryError> {
        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let stamp = now();
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, name, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("user with email {}", user.email)))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_SELECT_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))?;

        row_to_user(&row)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        self.find_by("email", email)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("user {email}")))
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_by("payments_customer_id", customer_id).await
    }

    async fn find_by_payout_account(
        &self,
        account_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_by("payout_account_id", account_id).await
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_SELECT_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_user).collect()
    }

    async fn set_role(&self, id: i64, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Self::expect_updated(id, result.rows_affected())
    }

    async fn set_subscription(
        &self,
        id: i64,
        status: SubscriptionStatus,
        plan: Option<SubscriptionTier>,
        customer_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET subscription_status = ?, subscription_plan = ?, payments_customer_id = COALESCE(?, payments_customer_id), updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(plan.map(|p| p.as_str()))
        .bind(customer_id)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Self::expect_updated(id, result.rows_affected())
    }

    async fn set_payout_account(&self, id: i64, account_id: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET payout_account_id = ?, updated_at = ? WHERE id = ?")
                .bind(account_id)
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
        Self::expect_updated(id, result.rows_affected())
    }

    async fn set_payouts_enabled(&self, id: i64, enabled: bool) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET payouts_enabled = ?, updated_at = ? WHERE id = ?")
                .bind(enabled)
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
        Self::expect_updated(id, result.rows_affected())
    }
}

/// `SQLite` implementation of the `SessionRepository` trait.
///
/// Only the SHA-256 hash of a bearer token is ever stored.
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &NewSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(ts(session.expires_at))
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "session"))?;
        Ok(())
    }

    async fn find_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_SELECT_COLUMNS} FROM users WHERE id = (SELECT user_id FROM sessions WHERE token_hash = ? AND expires_at > ?)"
        ))
        .bind(token_hash)
        .bind(ts(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete(&self, token_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE expires_at <= ?")
            .bind(ts(now))
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(ts(now))
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test".to_string(),
            role: UserRole::Client,
        }
    }

    #[tokio::test]
    async fn test_insert_defaults_and_duplicate_email() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        let user = repo.insert(&new_user("a@b.co")).await.unwrap();
        assert_eq!(user.subscription_status, SubscriptionStatus::Inactive);
        assert!(user.subscription_plan.is_none());
        assert!(!user.payouts_enabled);

        let err = repo.insert(&new_user("a@b.co")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_set_subscription_keeps_customer_when_absent() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let user = repo.insert(&new_user("sub@b.co")).await.unwrap();

        repo.set_subscription(
            user.id,
            SubscriptionStatus::Active,
            Some(SubscriptionTier::Pro),
            Some("cus_1"),
        )
        .await
        .unwrap();
        repo.set_subscription(user.id, SubscriptionStatus::PastDue, Some(SubscriptionTier::Pro), None)
            .await
            .unwrap();

        let found = repo.find_by_customer_id("cus_1").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.subscription_status, SubscriptionStatus::PastDue);
        assert_eq!(found.subscription_plan, Some(SubscriptionTier::Pro));
    }

    #[tokio::test]
    async fn test_set_role_unknown_user() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let err = repo.set_role(99, UserRole::Admin).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_session_lookup_respects_expiry() {
        let pool = setup_test_database().await.unwrap();
        let users = SqliteUserRepository::new(pool.clone());
        let sessions = SqliteSessionRepository::new(pool);
        let user = users.insert(&new_user("s@b.co")).await.unwrap();
        let now = Utc::now();

        sessions
            .create(&NewSession {
                user_id: user.id,
                token_hash: "live".into(),
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();
        sessions
            .create(&NewSession {
                user_id: user.id,
                token_hash: "dead".into(),
                expires_at: now - Duration::hours(1),
            })
            .await
            .unwrap();

        assert_eq!(sessions.find_user("live", now).await.unwrap().unwrap().id, user.id);
        assert!(sessions.find_user("dead", now).await.unwrap().is_none());
        assert!(sessions.find_user("missing", now).await.unwrap().is_none());

        assert_eq!(sessions.count_expired(now).await.unwrap(), 1);
        assert_eq!(sessions.delete_expired(now).await.unwrap(), 1);
        assert_eq!(sessions.count_expired(now).await.unwrap(), 0);

        sessions.delete("live").await.unwrap();
        sessions.delete("live").await.unwrap();
        assert!(sessions.find_user("live", now).await.unwrap().is_none());
    }
}

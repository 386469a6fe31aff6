//! Settings service - reads and updates platform settings.

use crate::domain::User;
use crate::ports::{CoreError, SettingsRepository};
use crate::settings::{PlatformSettings, PlatformSettingsUpdate, validate_settings};
use std::sync::Arc;
use tracing::info;

/// Service for platform settings.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Get current settings.
    pub async fn get(&self) -> Result<PlatformSettings, CoreError> {
        self.repo.load().await.map_err(CoreError::from)
    }

    /// Apply a partial update on behalf of an admin.
    pub async fn update(
        &self,
        actor: &User,
        update: PlatformSettingsUpdate,
    ) -> Result<PlatformSettings, CoreError> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden(
                "only admins can change platform settings".to_string(),
            ));
        }
        let mut current = self.repo.load().await?;
        current.merge(&update);
        validate_settings(&current)?;
        self.repo.save(&current).await?;
        info!(admin_id = actor.id, "Platform settings updated");
        Ok(current)
    }

    /// Save complete settings (validates first).
    pub async fn save(&self, settings: &PlatformSettings) -> Result<(), CoreError> {
        validate_settings(settings)?;
        self.repo.save(settings).await.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubscriptionStatus, UserRole};
    use crate::ports::RepositoryError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct MockSettingsRepo {
        settings: Mutex<PlatformSettings>,
    }

    impl MockSettingsRepo {
        fn new() -> Self {
            Self {
                settings: Mutex::new(PlatformSettings::with_defaults()),
            }
        }
    }

    #[async_trait]
    impl SettingsRepository for MockSettingsRepo {
        async fn load(&self) -> Result<PlatformSettings, RepositoryError> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn save(&self, settings: &PlatformSettings) -> Result<(), RepositoryError> {
            *self.settings.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: "admin@mercato.test".into(),
            password_hash: String::new(),
            name: "Admin".into(),
            role,
            subscription_status: SubscriptionStatus::Inactive,
            subscription_plan: None,
            payments_customer_id: None,
            payout_account_id: None,
            payouts_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_default_settings() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));
        let settings = service.get().await.unwrap();
        assert_eq!(settings.platform_fee_bps, 1_000);
        assert_eq!(settings.currency, "eur");
    }

    #[tokio::test]
    async fn test_update_settings_persists() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));
        let update = PlatformSettingsUpdate {
            platform_fee_bps: Some(1_500),
            currency: Some(" USD ".into()),
            ..Default::default()
        };

        let updated = service.update(&user(UserRole::Admin), update).await.unwrap();
        assert_eq!(updated.platform_fee_bps, 1_500);
        assert_eq!(updated.currency, "usd");

        let fetched = service.get().await.unwrap();
        assert_eq!(fetched.platform_fee_bps, 1_500);
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_and_not_saved() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));
        let update = PlatformSettingsUpdate {
            platform_fee_bps: Some(9_000),
            ..Default::default()
        };

        let err = service.update(&user(UserRole::Admin), update).await.unwrap_err();
        assert!(matches!(err, CoreError::Settings(_)));
        assert_eq!(service.get().await.unwrap().platform_fee_bps, 1_000);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_update() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));
        let err = service
            .update(&user(UserRole::Freelancer), PlatformSettingsUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}

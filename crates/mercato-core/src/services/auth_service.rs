//! Registration, login and bearer-session resolution.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    AuthSession, LoginRequest, NewSession, NewUser, RegisterRequest, User, UserRole,
};
use crate::ports::{
    ConversionEvent, ConversionTrackerPort, CoreError, RepositoryError, SessionRepository,
    SettingsRepository, UserRepository,
};
use crate::utils::credentials::{
    MIN_PASSWORD_LEN, generate_token, hash_password, hash_token, verify_password,
};
use crate::utils::validation::{ValidationErrors, is_valid_email, normalize_email};

/// Credential-based sessions backed by opaque bearer tokens.
///
/// Only the SHA-256 of a token is stored, so a leaked database does not
/// leak usable sessions.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    settings: Arc<dyn SettingsRepository>,
    conversions: Arc<dyn ConversionTrackerPort>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        settings: Arc<dyn SettingsRepository>,
        conversions: Arc<dyn ConversionTrackerPort>,
    ) -> Self {
        Self {
            users,
            sessions,
            settings,
            conversions,
        }
    }

    /// Create an account and open a session for it.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, CoreError> {
        let email = normalize_email(&request.email);
        let name = request.name.trim().to_string();
        let role = request.role.unwrap_or(UserRole::Client);

        let mut errors = ValidationErrors::new();
        errors.check(!is_valid_email(&email), "email", "must be a valid email address");
        errors.check(
            request.password.chars().count() < MIN_PASSWORD_LEN,
            "password",
            "must be at least 8 characters",
        );
        errors.check(name.is_empty(), "name", "is required");
        errors.check(
            role == UserRole::Admin,
            "role",
            "must be CLIENT or FREELANCER",
        );
        errors.into_result()?;

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .insert(&NewUser {
                email,
                password_hash,
                name,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyExists(_) => {
                    CoreError::Conflict("email is already registered".to_string())
                }
                other => other.into(),
            })?;

        info!(user_id = user.id, role = %user.role, "Registered user");
        self.track_registration(&user).await;
        self.open_session(user).await
    }

    /// Exchange credentials for a session.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, CoreError> {
        let email = normalize_email(&request.email);
        let user = match self.users.get_by_email(&email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound(_)) => return Err(invalid_credentials()),
            Err(e) => return Err(e.into()),
        };

        if !verify_password(&user.password_hash, &request.password) {
            warn!(user_id = user.id, "Rejected login with wrong password");
            return Err(invalid_credentials());
        }

        self.open_session(user).await
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, CoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::Unauthorized("missing bearer token".to_string()));
        }
        self.sessions
            .find_user(&hash_token(token), Utc::now())
            .await?
            .ok_or_else(|| CoreError::Unauthorized("invalid or expired session".to_string()))
    }

    pub async fn logout(&self, token: &str) -> Result<(), CoreError> {
        self.sessions.delete(&hash_token(token.trim())).await?;
        debug!("Session closed");
        Ok(())
    }

    async fn open_session(&self, user: User) -> Result<AuthSession, CoreError> {
        let settings = self.settings.load().await?;
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(i64::from(settings.session_ttl_hours));

        self.sessions
            .create(&NewSession {
                user_id: user.id,
                token_hash: hash_token(&token),
                expires_at,
            })
            .await?;

        Ok(AuthSession {
            token,
            expires_at,
            user,
        })
    }

    async fn track_registration(&self, user: &User) {
        let event = ConversionEvent {
            name: "CompleteRegistration".to_string(),
            event_id: format!("register-{}", user.id),
            email: Some(user.email.clone()),
            value_cents: None,
            currency: None,
        };
        if let Err(e) = self.conversions.track(&event).await {
            warn!(user_id = user.id, error = %e, "Conversion tracking failed");
        }
    }
}

fn invalid_credentials() -> CoreError {
    CoreError::Unauthorized("invalid email or password".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubscriptionStatus, SubscriptionTier};
    use crate::ports::{NoopConversionTracker, SettingsRepository};
    use crate::settings::PlatformSettings;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for MemoryUsers {
        async fn insert(&self, new: &NewUser) -> Result<User, RepositoryError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == new.email) {
                return Err(RepositoryError::AlreadyExists(new.email.clone()));
            }
            let user = User {
                id: users.len() as i64 + 1,
                email: new.email.clone(),
                password_hash: new.password_hash.clone(),
                name: new.name.clone(),
                role: new.role,
                subscription_status: SubscriptionStatus::Inactive,
                subscription_plan: None,
                payments_customer_id: None,
                payout_account_id: None,
                payouts_enabled: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        }
        async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
        }
        async fn get_by_email(&self, email: &str) -> Result<User, RepositoryError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|u| u.email == email)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(email.to_string()))
        }
        async fn find_by_customer_id(&self, _: &str) -> Result<Option<User>, RepositoryError> {
            Ok(None)
        }
        async fn find_by_payout_account(&self, _: &str) -> Result<Option<User>, RepositoryError> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<User>, RepositoryError> {
            Ok(self.users.lock().unwrap().clone())
        }
        async fn set_role(&self, _: i64, _: UserRole) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn set_subscription(
            &self,
            _: i64,
            _: SubscriptionStatus,
            _: Option<SubscriptionTier>,
            _: Option<&str>,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn set_payout_account(&self, _: i64, _: &str) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn set_payouts_enabled(&self, _: i64, _: bool) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    struct MemorySessions {
        users: Arc<MemoryUsers>,
        sessions: Mutex<Vec<NewSession>>,
    }

    #[async_trait]
    impl SessionRepository for MemorySessions {
        async fn create(&self, session: &NewSession) -> Result<(), RepositoryError> {
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }
        async fn find_user(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<User>, RepositoryError> {
            let user_id = self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.token_hash == token_hash && s.expires_at > now)
                .map(|s| s.user_id);
            match user_id {
                Some(id) => self.users.get_by_id(id).await.map(Some),
                None => Ok(None),
            }
        }
        async fn delete(&self, token_hash: &str) -> Result<(), RepositoryError> {
            self.sessions
                .lock()
                .unwrap()
                .retain(|s| s.token_hash != token_hash);
            Ok(())
        }
        async fn count_expired(&self, _: DateTime<Utc>) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn delete_expired(&self, _: DateTime<Utc>) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    struct DefaultSettings;

    #[async_trait]
    impl SettingsRepository for DefaultSettings {
        async fn load(&self) -> Result<PlatformSettings, RepositoryError> {
            Ok(PlatformSettings::with_defaults())
        }
        async fn save(&self, _: &PlatformSettings) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn service() -> AuthService {
        let users = Arc::new(MemoryUsers::default());
        let sessions = Arc::new(MemorySessions {
            users: users.clone(),
            sessions: Mutex::new(Vec::new()),
        });
        AuthService::new(
            users,
            sessions,
            Arc::new(DefaultSettings),
            Arc::new(NoopConversionTracker),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "correct horse".into(),
            name: "Ana".into(),
            role: Some(UserRole::Freelancer),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let auth = service();
        let session = auth.register(register_request(" Ana@Example.com ")).await.unwrap();

        assert_eq!(session.user.email, "ana@example.com");
        assert_eq!(session.token.len(), 64);

        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let auth = service();
        auth.register(register_request("ana@example.com")).await.unwrap();
        let err = auth
            .register(register_request("ANA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_reports_every_invalid_field() {
        let auth = service();
        let err = auth
            .register(RegisterRequest {
                email: "nope".into(),
                password: "short".into(),
                name: " ".into(),
                role: Some(UserRole::Admin),
            })
            .await
            .unwrap_err();
        let CoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        for field in ["email", "password", "name", "role"] {
            assert!(errors.get(field).is_some(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let auth = service();
        auth.register(register_request("ana@example.com")).await.unwrap();

        let err = auth
            .login(LoginRequest {
                email: "ana@example.com".into(),
                password: "wrong password".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        let ok = auth
            .login(LoginRequest {
                email: "ANA@example.com".into(),
                password: "correct horse".into(),
            })
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let auth = service();
        let session = auth.register(register_request("ana@example.com")).await.unwrap();
        auth.logout(&session.token).await.unwrap();

        let err = auth.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }
}

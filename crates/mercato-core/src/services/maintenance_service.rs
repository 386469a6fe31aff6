//! Maintenance operations run from the command line: demo seeding,
//! periodic cleanup and admin promotion.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    Business, BusinessProfile, MissionStatus, NewBusiness, NewMission, NewUser, ServiceInput,
    SubscriptionTier, User, UserRole, VerificationStatus,
};
use crate::ports::{
    BusinessRepository, CoreError, MissionRepository, RepositoryError, ServiceRepository,
    SessionRepository, SettingsRepository, UserRepository,
};
use crate::utils::credentials::{MIN_PASSWORD_LEN, hash_password};
use crate::utils::validation::{normalize_email, slugify};

/// Default password given to seeded accounts.
pub const DEFAULT_SEED_PASSWORD: &str = "mercato-demo";

/// What `seed` created. Existing rows are left untouched and not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub businesses: usize,
    pub services: usize,
    pub missions: usize,
}

/// What `cleanup` removed, or would remove in a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub expired_sessions: u64,
    pub cancelled_missions: Vec<i64>,
}

struct DemoUser {
    email: &'static str,
    name: &'static str,
    role: UserRole,
}

struct DemoListing {
    owner: &'static str,
    name: &'static str,
    category: &'static str,
    city: &'static str,
    description: &'static str,
    tier: SubscriptionTier,
    verified: bool,
    ai_prompt: Option<&'static str>,
    services: &'static [(&'static str, i64, Option<i64>)],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        email: "admin@mercato.test",
        name: "Mercato Admin",
        role: UserRole::Admin,
    },
    DemoUser {
        email: "ana@mercato.test",
        name: "Ana Ribeiro",
        role: UserRole::Freelancer,
    },
    DemoUser {
        email: "marco@mercato.test",
        name: "Marco Silva",
        role: UserRole::Freelancer,
    },
    DemoUser {
        email: "concierge@mercato.test",
        name: "Mercato Concierge",
        role: UserRole::Freelancer,
    },
    DemoUser {
        email: "chloe@mercato.test",
        name: "Chloe Martin",
        role: UserRole::Client,
    },
];

const DEMO_LISTINGS: &[DemoListing] = &[
    DemoListing {
        owner: "ana@mercato.test",
        name: "Atelier Ana",
        category: "design",
        city: "Lisbon",
        description: "Brand identities and websites for small businesses.",
        tier: SubscriptionTier::Premium,
        verified: true,
        ai_prompt: None,
        services: &[("Logo design", 45_000, None), ("Brand workshop", 90_000, Some(120))],
    },
    DemoListing {
        owner: "marco@mercato.test",
        name: "Silva Plumbing",
        category: "plumbing",
        city: "Porto",
        description: "Leaks, boilers and bathroom renovations.",
        tier: SubscriptionTier::Pro,
        verified: false,
        ai_prompt: None,
        services: &[("Leak repair", 8_000, Some(60))],
    },
    DemoListing {
        owner: "concierge@mercato.test",
        name: "Mercato Concierge",
        category: "assistant",
        city: "Lisbon",
        description: "Ask anything about finding the right professional.",
        tier: SubscriptionTier::Free,
        verified: false,
        ai_prompt: Some("Help visitors describe their project and suggest a category."),
        services: &[("Project scoping chat", 0, Some(15))],
    },
];

pub struct MaintenanceService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceRepository>,
    missions: Arc<dyn MissionRepository>,
    settings: Arc<dyn SettingsRepository>,
}

impl MaintenanceService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceRepository>,
        missions: Arc<dyn MissionRepository>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            users,
            sessions,
            businesses,
            services,
            missions,
            settings,
        }
    }

    /// Insert the demo accounts, listings, services and one mission.
    ///
    /// Safe to run repeatedly: anything that already exists is skipped.
    pub async fn seed(&self, password: &str) -> Result<SeedReport, CoreError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::invalid(
                "password",
                "must be at least 8 characters",
            ));
        }
        let mut report = SeedReport::default();
        let password_hash = hash_password(password)?;

        for demo in DEMO_USERS {
            if self.ensure_user(demo, &password_hash).await? {
                report.users += 1;
            }
        }

        for demo in DEMO_LISTINGS {
            let owner = self.users.get_by_email(demo.owner).await?;
            if self.businesses.find_by_owner(owner.id).await?.is_some() {
                continue;
            }
            let business = self.create_listing(&owner, demo).await?;
            report.businesses += 1;
            for (name, price_cents, duration_minutes) in demo.services {
                self.services
                    .insert(
                        business.id,
                        &ServiceInput {
                            name: (*name).to_string(),
                            description: None,
                            price_cents: *price_cents,
                            duration_minutes: *duration_minutes,
                        },
                    )
                    .await?;
                report.services += 1;
            }
        }

        let client = self.users.get_by_email("chloe@mercato.test").await?;
        if self.missions.list_for_client(client.id).await?.is_empty() {
            let ana = self.users.get_by_email("ana@mercato.test").await?;
            if let Some(listing) = self.businesses.find_by_owner(ana.id).await? {
                self.missions
                    .insert(&NewMission {
                        business_id: listing.id,
                        client_id: client.id,
                        client_email: client.email.clone(),
                        client_name: Some(client.name.clone()),
                        title: "Logo refresh".to_string(),
                        description: "Modernise the logo of a family bakery.".to_string(),
                        budget_cents: 60_000,
                        deadline: Some(Utc::now() + Duration::days(21)),
                    })
                    .await?;
                report.missions += 1;
            }
        }

        info!(
            users = report.users,
            businesses = report.businesses,
            services = report.services,
            missions = report.missions,
            "Seed complete"
        );
        Ok(report)
    }

    /// Remove expired sessions and cancel stale pending missions.
    pub async fn cleanup(&self, dry_run: bool) -> Result<CleanupReport, CoreError> {
        let now = Utc::now();
        let settings = self.settings.load().await?;
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(settings.stale_mission_days)))
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "stale mission threshold of {} days is out of range",
                    settings.stale_mission_days
                ))
            })?;

        let expired_sessions = if dry_run {
            self.sessions.count_expired(now).await?
        } else {
            self.sessions.delete_expired(now).await?
        };

        let stale = self.missions.list_stale_pending(cutoff).await?;
        let mut cancelled_missions = Vec::with_capacity(stale.len());
        for mission in stale {
            if !dry_run {
                self.missions
                    .set_status(mission.id, MissionStatus::Cancelled)
                    .await?;
                debug!(mission_id = mission.id, "Cancelled stale mission");
            }
            cancelled_missions.push(mission.id);
        }

        info!(
            dry_run,
            expired_sessions,
            stale_missions = cancelled_missions.len(),
            "Cleanup finished"
        );
        Ok(CleanupReport {
            dry_run,
            expired_sessions,
            cancelled_missions,
        })
    }

    /// Grant the admin role to an existing account.
    pub async fn promote_admin(&self, email: &str) -> Result<User, CoreError> {
        let user = self.users.get_by_email(&normalize_email(email)).await?;
        if user.is_admin() {
            return Ok(user);
        }
        self.users.set_role(user.id, UserRole::Admin).await?;
        info!(user_id = user.id, "Promoted to admin");
        self.users.get_by_id(user.id).await.map_err(CoreError::from)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.users.list().await.map_err(CoreError::from)
    }

    async fn ensure_user(&self, demo: &DemoUser, password_hash: &str) -> Result<bool, CoreError> {
        match self.users.get_by_email(demo.email).await {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let stored_role = if demo.role == UserRole::Admin {
            UserRole::Client
        } else {
            demo.role
        };
        let user = self
            .users
            .insert(&NewUser {
                email: demo.email.to_string(),
                password_hash: password_hash.to_string(),
                name: demo.name.to_string(),
                role: stored_role,
            })
            .await?;
        if demo.role == UserRole::Admin {
            self.users.set_role(user.id, UserRole::Admin).await?;
        }
        Ok(true)
    }

    async fn create_listing(&self, owner: &User, demo: &DemoListing) -> Result<Business, CoreError> {
        let base = slugify(demo.name);
        let mut slug = base.clone();
        let mut suffix = 2;
        while self.businesses.slug_exists(&slug).await? {
            slug = format!("{base}-{suffix}");
            suffix += 1;
        }

        let business = self
            .businesses
            .insert(&NewBusiness {
                owner_id: owner.id,
                slug,
                profile: BusinessProfile {
                    name: demo.name.to_string(),
                    description: Some(demo.description.to_string()),
                    category: demo.category.to_string(),
                    city: Some(demo.city.to_string()),
                    phone: None,
                    website: None,
                    is_ai_agent: demo.ai_prompt.is_some(),
                    ai_prompt: demo.ai_prompt.map(str::to_string),
                    ai_price_cents: demo.ai_prompt.map(|_| 0),
                },
            })
            .await?;
        if demo.tier != SubscriptionTier::Free {
            self.businesses.set_tier(business.id, demo.tier).await?;
        }
        if demo.verified {
            self.businesses
                .set_verification(business.id, VerificationStatus::Verified)
                .await?;
        }
        Ok(business)
    }
}

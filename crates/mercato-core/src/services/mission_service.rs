//! Mission requests: creation, visibility, status changes and messaging.
//!
//! Payment-driven transitions (`PENDING -> IN_PROGRESS` and
//! `-> COMPLETED`) live in the escrow service; this service only allows the
//! transitions a participant may make by hand.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    Business, CreateMission, MAX_BUDGET_CENTS, MissionMessage, MissionMessageInput, MissionParty,
    MissionRequest, MissionStatus, MissionView, NewMission, User,
};
use crate::ports::{BusinessRepository, CoreError, MissionRepository, PaymentRepository};
use crate::utils::validation::{ValidationErrors, clean_optional, is_valid_email, normalize_email};

const MAX_MESSAGE_CHARS: usize = 5_000;

/// The caller's relationship to a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Participant {
    Client,
    Freelancer,
    Admin,
}

pub struct MissionService {
    missions: Arc<dyn MissionRepository>,
    payments: Arc<dyn PaymentRepository>,
    businesses: Arc<dyn BusinessRepository>,
}

impl MissionService {
    pub fn new(
        missions: Arc<dyn MissionRepository>,
        payments: Arc<dyn PaymentRepository>,
        businesses: Arc<dyn BusinessRepository>,
    ) -> Self {
        Self {
            missions,
            payments,
            businesses,
        }
    }

    /// Open a mission request against a freelancer listing.
    pub async fn create(
        &self,
        user: &User,
        request: CreateMission,
    ) -> Result<MissionRequest, CoreError> {
        let new = validate_create(user.id, request)?;
        let business = self.businesses.get_by_id(new.business_id).await?;
        if business.owner_id == user.id {
            return Err(CoreError::Forbidden(
                "you cannot request a mission from your own listing".to_string(),
            ));
        }

        let mission = self.missions.insert(&new).await?;
        info!(
            mission_id = mission.id,
            business_id = business.id,
            budget_cents = mission.budget_cents,
            "Mission requested"
        );
        Ok(mission)
    }

    /// Missions where the caller is the client, or those sent to their listing.
    pub async fn list(
        &self,
        user: &User,
        party: MissionParty,
    ) -> Result<Vec<MissionRequest>, CoreError> {
        match party {
            MissionParty::Client => self
                .missions
                .list_for_client(user.id)
                .await
                .map_err(CoreError::from),
            MissionParty::Freelancer => match self.businesses.find_by_owner(user.id).await? {
                Some(business) => self
                    .missions
                    .list_for_business(business.id)
                    .await
                    .map_err(CoreError::from),
                None => Ok(Vec::new()),
            },
        }
    }

    /// A mission with its latest payment, visible to participants only.
    pub async fn get(&self, user: &User, id: i64) -> Result<MissionView, CoreError> {
        let (mission, _, _) = self.load_for(user, id).await?;
        let payment = self.payments.latest_for_mission(id).await?;
        Ok(MissionView { mission, payment })
    }

    /// Apply a manual status change.
    ///
    /// Either party may cancel a pending mission; the freelancer may mark an
    /// in-progress mission delivered. Everything else is driven by payments.
    pub async fn update_status(
        &self,
        user: &User,
        id: i64,
        status: MissionStatus,
    ) -> Result<MissionRequest, CoreError> {
        let (mut mission, _, participant) = self.load_for(user, id).await?;

        match status {
            MissionStatus::Cancelled => {
                if mission.status != MissionStatus::Pending {
                    return Err(CoreError::Conflict(format!(
                        "a {} mission cannot be cancelled",
                        mission.status
                    )));
                }
            }
            MissionStatus::Delivered => {
                if participant == Participant::Client {
                    return Err(CoreError::Forbidden(
                        "only the freelancer can mark a mission delivered".to_string(),
                    ));
                }
                if mission.status != MissionStatus::InProgress {
                    return Err(CoreError::Conflict(format!(
                        "a {} mission cannot be delivered",
                        mission.status
                    )));
                }
            }
            MissionStatus::Pending | MissionStatus::InProgress | MissionStatus::Completed => {
                return Err(CoreError::Conflict(format!(
                    "status {status} is set by the payment flow"
                )));
            }
        }

        self.missions.set_status(id, status).await?;
        info!(mission_id = id, from = %mission.status, to = %status, "Mission status changed");
        mission.status = status;
        Ok(mission)
    }

    pub async fn messages(&self, user: &User, id: i64) -> Result<Vec<MissionMessage>, CoreError> {
        self.load_for(user, id).await?;
        self.missions
            .list_messages(id)
            .await
            .map_err(CoreError::from)
    }

    pub async fn post_message(
        &self,
        user: &User,
        id: i64,
        input: MissionMessageInput,
    ) -> Result<MissionMessage, CoreError> {
        self.load_for(user, id).await?;
        let body = input.body.trim();
        if body.is_empty() {
            return Err(CoreError::invalid("body", "is required"));
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Err(CoreError::invalid("body", "is too long"));
        }
        self.missions
            .add_message(id, user.id, body)
            .await
            .map_err(CoreError::from)
    }

    /// Load a mission and its listing, failing with 403 for outsiders.
    pub(crate) async fn load_for(
        &self,
        user: &User,
        id: i64,
    ) -> Result<(MissionRequest, Business, Participant), CoreError> {
        let mission = self.missions.get_by_id(id).await?;
        let business = self.businesses.get_by_id(mission.business_id).await?;
        let participant = if mission.client_id == user.id {
            Participant::Client
        } else if business.owner_id == user.id {
            Participant::Freelancer
        } else if user.is_admin() {
            Participant::Admin
        } else {
            return Err(CoreError::Forbidden(
                "you are not a participant of this mission".to_string(),
            ));
        };
        Ok((mission, business, participant))
    }
}

fn validate_create(client_id: i64, request: CreateMission) -> Result<NewMission, CoreError> {
    let client_email = clean_optional(request.client_email).map(|e| normalize_email(&e));
    let title = clean_optional(request.title);
    let description = clean_optional(request.description);

    let mut errors = ValidationErrors::new();
    match client_email.as_deref() {
        None => errors.add("client_email", "is required"),
        Some(email) if !is_valid_email(email) => {
            errors.add("client_email", "must be a valid email address");
        }
        Some(_) => {}
    }
    errors.check(title.is_none(), "title", "is required");
    errors.check(description.is_none(), "description", "is required");
    errors.check(request.budget_cents <= 0, "budget_cents", "must be positive");
    errors.check(
        request.budget_cents > MAX_BUDGET_CENTS,
        "budget_cents",
        "must be at most 100000000000",
    );
    errors.check(request.business_id <= 0, "business_id", "is required");
    errors.into_result()?;

    Ok(NewMission {
        business_id: request.business_id,
        client_id,
        client_email: client_email.unwrap_or_default(),
        client_name: clean_optional(request.client_name),
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        budget_cents: request.budget_cents,
        deadline: request.deadline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateMission {
        CreateMission {
            business_id: 3,
            client_email: Some(" Client@Example.com ".into()),
            client_name: Some("Chloe".into()),
            title: Some("Logo".into()),
            description: Some("A new logo".into()),
            budget_cents: 50_000,
            deadline: None,
        }
    }

    #[test]
    fn test_missing_client_email_is_a_validation_error() {
        let err = validate_create(
            1,
            CreateMission {
                client_email: None,
                ..request()
            },
        )
        .unwrap_err();
        let CoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("client_email"), Some("is required"));
    }

    #[test]
    fn test_create_normalizes_email() {
        let new = validate_create(9, request()).unwrap();
        assert_eq!(new.client_email, "client@example.com");
        assert_eq!(new.client_id, 9);
    }

    #[test]
    fn test_budget_must_be_positive() {
        let err = validate_create(
            1,
            CreateMission {
                budget_cents: 0,
                ..request()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_budget_is_capped() {
        let err = validate_create(
            1,
            CreateMission {
                budget_cents: MAX_BUDGET_CENTS + 1,
                ..request()
            },
        )
        .unwrap_err();
        let CoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.fields().contains_key("budget_cents"));

        let ok = validate_create(
            1,
            CreateMission {
                budget_cents: MAX_BUDGET_CENTS,
                ..request()
            },
        );
        assert!(ok.is_ok());
    }
}

//! Listings, their services and reviews.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    Business, BusinessDetail, BusinessProfile, BusinessSearch, NewBusiness, NewReview, Review,
    ReviewInput, SearchPage, Service, ServiceInput, User, UserRole, VerificationStatus,
};
use crate::ports::{
    BusinessRepository, CoreError, RepositoryError, ReviewRepository, ServiceRepository,
};
use crate::utils::validation::{ValidationErrors, clean_optional, is_blank, is_http_url, slugify};

const FALLBACK_SLUG: &str = "listing";

/// Service for business listings and everything hanging off them.
pub struct BusinessService {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl BusinessService {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self {
            businesses,
            services,
            reviews,
        }
    }

    /// Ranked, paginated listing search.
    pub async fn search(&self, search: BusinessSearch) -> Result<SearchPage<Business>, CoreError> {
        let search = search.normalized();
        debug!(q = ?search.q, page = search.page, "Searching listings");
        self.businesses.search(&search).await.map_err(CoreError::from)
    }

    /// Look a listing up by numeric id or by slug, with its services.
    pub async fn detail(&self, id_or_slug: &str) -> Result<BusinessDetail, CoreError> {
        let business = match id_or_slug.parse::<i64>() {
            Ok(id) => self.businesses.get_by_id(id).await?,
            Err(_) => self.businesses.get_by_slug(id_or_slug).await?,
        };
        let services = self.services.list_for_business(business.id).await?;
        Ok(BusinessDetail { business, services })
    }

    pub async fn get(&self, id: i64) -> Result<Business, CoreError> {
        self.businesses.get_by_id(id).await.map_err(CoreError::from)
    }

    pub async fn list_all(&self) -> Result<Vec<Business>, CoreError> {
        self.businesses.list_all().await.map_err(CoreError::from)
    }

    /// The caller's own listing, if they have one.
    pub async fn mine(&self, user: &User) -> Result<Option<Business>, CoreError> {
        self.businesses
            .find_by_owner(user.id)
            .await
            .map_err(CoreError::from)
    }

    /// Create or update the caller's listing.
    ///
    /// The slug follows the name: it is recomputed when the name changes and
    /// suffixed with `-2`, `-3`, ... until it is unique.
    pub async fn upsert_mine(
        &self,
        user: &User,
        profile: BusinessProfile,
    ) -> Result<Business, CoreError> {
        if user.role != UserRole::Freelancer {
            return Err(CoreError::Forbidden(
                "only freelancers can publish a listing".to_string(),
            ));
        }
        let profile = clean_profile(profile);
        validate_profile(&profile)?;

        match self.businesses.find_by_owner(user.id).await? {
            Some(mut business) => {
                if business.name != profile.name {
                    business.slug = self.unique_slug(&profile.name, Some(&business.slug)).await?;
                }
                business.apply_profile(profile);
                self.businesses.update(&business).await?;
                info!(business_id = business.id, "Listing updated");
                self.businesses
                    .get_by_id(business.id)
                    .await
                    .map_err(CoreError::from)
            }
            None => {
                let slug = self.unique_slug(&profile.name, None).await?;
                let business = self
                    .businesses
                    .insert(&NewBusiness {
                        owner_id: user.id,
                        slug,
                        profile,
                    })
                    .await
                    .map_err(|e| match e {
                        RepositoryError::AlreadyExists(msg) => CoreError::Conflict(msg),
                        other => other.into(),
                    })?;
                info!(business_id = business.id, slug = %business.slug, "Listing created");
                Ok(business)
            }
        }
    }

    /// Ask an admin to verify the caller's listing.
    pub async fn request_verification(&self, user: &User) -> Result<Business, CoreError> {
        let mut business = self.owned_listing(user).await?;
        match business.verification_status {
            VerificationStatus::Unverified | VerificationStatus::Rejected => {
                self.businesses
                    .set_verification(business.id, VerificationStatus::Pending)
                    .await?;
                business.verification_status = VerificationStatus::Pending;
                info!(business_id = business.id, "Verification requested");
                Ok(business)
            }
            VerificationStatus::Pending => Err(CoreError::Conflict(
                "verification is already pending".to_string(),
            )),
            VerificationStatus::Verified => {
                Err(CoreError::Conflict("listing is already verified".to_string()))
            }
        }
    }

    /// Admin decision on a listing's verification.
    pub async fn set_verification(
        &self,
        actor: &User,
        business_id: i64,
        status: VerificationStatus,
    ) -> Result<Business, CoreError> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden(
                "only admins can verify listings".to_string(),
            ));
        }
        self.businesses.set_verification(business_id, status).await?;
        info!(business_id, status = %status, admin_id = actor.id, "Verification updated");
        self.get(business_id).await
    }

    pub async fn list_services(&self, business_id: i64) -> Result<Vec<Service>, CoreError> {
        self.businesses.get_by_id(business_id).await?;
        self.services
            .list_for_business(business_id)
            .await
            .map_err(CoreError::from)
    }

    /// Add a service to the caller's listing.
    pub async fn create_service(
        &self,
        user: &User,
        input: ServiceInput,
    ) -> Result<Service, CoreError> {
        let business = self.owned_listing(user).await?;
        let input = clean_service(input);
        validate_service(&input)?;
        let service = self.services.insert(business.id, &input).await?;
        debug!(service_id = service.id, business_id = business.id, "Service created");
        Ok(service)
    }

    pub async fn update_service(
        &self,
        user: &User,
        id: i64,
        input: ServiceInput,
    ) -> Result<Service, CoreError> {
        self.owned_service(user, id).await?;
        let input = clean_service(input);
        validate_service(&input)?;
        self.services
            .update(id, &input)
            .await
            .map_err(CoreError::from)
    }

    pub async fn delete_service(&self, user: &User, id: i64) -> Result<(), CoreError> {
        self.owned_service(user, id).await?;
        self.services.delete(id).await.map_err(CoreError::from)
    }

    pub async fn list_reviews(&self, business_id: i64) -> Result<Vec<Review>, CoreError> {
        self.businesses.get_by_id(business_id).await?;
        self.reviews
            .list_for_business(business_id)
            .await
            .map_err(CoreError::from)
    }

    /// Review a listing. One review per author; owners cannot review themselves.
    pub async fn add_review(
        &self,
        user: &User,
        business_id: i64,
        input: ReviewInput,
    ) -> Result<Review, CoreError> {
        let business = self.businesses.get_by_id(business_id).await?;
        if business.owner_id == user.id {
            return Err(CoreError::Forbidden(
                "you cannot review your own listing".to_string(),
            ));
        }
        if !(1..=5).contains(&input.rating) {
            return Err(CoreError::invalid("rating", "must be between 1 and 5"));
        }

        let review = self
            .reviews
            .insert(&NewReview {
                business_id,
                author_id: user.id,
                rating: input.rating,
                comment: clean_optional(input.comment),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyExists(_) => {
                    CoreError::Conflict("you already reviewed this listing".to_string())
                }
                other => other.into(),
            })?;
        info!(business_id, review_id = review.id, rating = review.rating, "Review added");
        Ok(review)
    }

    async fn owned_listing(&self, user: &User) -> Result<Business, CoreError> {
        self.businesses
            .find_by_owner(user.id)
            .await?
            .ok_or_else(|| CoreError::NotFound("you do not have a listing yet".to_string()))
    }

    async fn owned_service(&self, user: &User, id: i64) -> Result<Service, CoreError> {
        let service = self.services.get_by_id(id).await?;
        let owns = self
            .businesses
            .find_by_owner(user.id)
            .await?
            .is_some_and(|b| b.id == service.business_id);
        if !owns && !user.is_admin() {
            return Err(CoreError::Forbidden(
                "service belongs to another listing".to_string(),
            ));
        }
        Ok(service)
    }

    async fn unique_slug(&self, name: &str, current: Option<&str>) -> Result<String, CoreError> {
        let mut base = slugify(name);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }
        let mut candidate = base.clone();
        let mut suffix = 2;
        loop {
            if current == Some(candidate.as_str()) || !self.businesses.slug_exists(&candidate).await?
            {
                return Ok(candidate);
            }
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
    }
}

fn clean_profile(profile: BusinessProfile) -> BusinessProfile {
    BusinessProfile {
        name: profile.name.trim().to_string(),
        description: clean_optional(profile.description),
        category: profile.category.trim().to_string(),
        city: clean_optional(profile.city),
        phone: clean_optional(profile.phone),
        website: clean_optional(profile.website),
        is_ai_agent: profile.is_ai_agent,
        ai_prompt: clean_optional(profile.ai_prompt),
        ai_price_cents: profile.ai_price_cents,
    }
}

fn validate_profile(profile: &BusinessProfile) -> Result<(), CoreError> {
    let mut errors = ValidationErrors::new();
    errors.check(profile.name.is_empty(), "name", "is required");
    errors.check(profile.name.chars().count() > 120, "name", "is too long");
    errors.check(profile.category.is_empty(), "category", "is required");
    errors.check(
        profile.website.as_deref().is_some_and(|w| !is_http_url(w)),
        "website",
        "must be an http(s) URL",
    );
    errors.check(
        profile.is_ai_agent && is_blank(profile.ai_prompt.as_deref()),
        "ai_prompt",
        "is required for AI agents",
    );
    errors.check(
        profile.ai_price_cents.is_some_and(|p| p < 0),
        "ai_price_cents",
        "must not be negative",
    );
    errors.into_result()
}

fn clean_service(input: ServiceInput) -> ServiceInput {
    ServiceInput {
        name: input.name.trim().to_string(),
        description: clean_optional(input.description),
        ..input
    }
}

fn validate_service(input: &ServiceInput) -> Result<(), CoreError> {
    let mut errors = ValidationErrors::new();
    errors.check(input.name.is_empty(), "name", "is required");
    errors.check(input.price_cents < 0, "price_cents", "must not be negative");
    errors.check(
        input.duration_minutes.is_some_and(|d| d <= 0),
        "duration_minutes",
        "must be positive",
    );
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> BusinessProfile {
        BusinessProfile {
            name: "  Atelier Ana ".into(),
            category: "design".into(),
            website: Some(" ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_profile_trims_and_drops_blanks() {
        let cleaned = clean_profile(profile());
        assert_eq!(cleaned.name, "Atelier Ana");
        assert!(cleaned.website.is_none());
        assert!(validate_profile(&cleaned).is_ok());
    }

    #[test]
    fn test_ai_agent_requires_prompt() {
        let cleaned = clean_profile(BusinessProfile {
            is_ai_agent: true,
            ai_prompt: Some("   ".into()),
            ..profile()
        });
        let Err(CoreError::Validation(errors)) = validate_profile(&cleaned) else {
            panic!("expected validation error");
        };
        assert!(errors.get("ai_prompt").is_some());
    }

    #[test]
    fn test_website_must_be_http() {
        let cleaned = clean_profile(BusinessProfile {
            website: Some("ftp://atelier".into()),
            ..profile()
        });
        assert!(validate_profile(&cleaned).is_err());
    }

    #[test]
    fn test_service_validation() {
        let bad = ServiceInput {
            name: " ".into(),
            price_cents: -1,
            duration_minutes: Some(0),
            ..Default::default()
        };
        let Err(CoreError::Validation(errors)) = validate_service(&clean_service(bad)) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().len(), 3);
    }
}

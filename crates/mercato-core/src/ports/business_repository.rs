//! Listing, service and review repository trait definitions.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{
    Business, BusinessSearch, NewBusiness, NewReview, Review, SearchPage, Service, ServiceInput,
    SubscriptionTier, VerificationStatus,
};

/// Repository for business listings.
///
/// Search ordering (tier, then rating, then newest) is part of the contract
/// so every implementation ranks results the same way.
#[async_trait]
pub trait BusinessRepository: Send + Sync {
    /// Insert a listing.
    ///
    /// Returns `Err(RepositoryError::AlreadyExists)` if the owner already
    /// has a listing or the slug is taken.
    async fn insert(&self, business: &NewBusiness) -> Result<Business, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<Business, RepositoryError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Business, RepositoryError>;

    async fn find_by_owner(&self, owner_id: i64) -> Result<Option<Business>, RepositoryError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError>;

    /// Persist the profile fields and slug of an existing listing.
    async fn update(&self, business: &Business) -> Result<(), RepositoryError>;

    async fn search(&self, search: &BusinessSearch)
    -> Result<SearchPage<Business>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Business>, RepositoryError>;

    async fn set_tier(&self, id: i64, tier: SubscriptionTier) -> Result<(), RepositoryError>;

    async fn set_verification(
        &self,
        id: i64,
        status: VerificationStatus,
    ) -> Result<(), RepositoryError>;
}

/// Repository for the services a listing offers.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn list_for_business(&self, business_id: i64) -> Result<Vec<Service>, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<Service, RepositoryError>;

    async fn insert(
        &self,
        business_id: i64,
        input: &ServiceInput,
    ) -> Result<Service, RepositoryError>;

    async fn update(&self, id: i64, input: &ServiceInput) -> Result<Service, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

/// Repository for listing reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn list_for_business(&self, business_id: i64) -> Result<Vec<Review>, RepositoryError>;

    /// Insert a review and refresh the listing's rating aggregate.
    ///
    /// Returns `Err(RepositoryError::AlreadyExists)` if the author already
    /// reviewed this listing.
    async fn insert(&self, review: &NewReview) -> Result<Review, RepositoryError>;
}

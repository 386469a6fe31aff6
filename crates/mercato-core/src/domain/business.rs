//! Business listings, their services and reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    /// Paid placement tier of a listing.
    pub enum SubscriptionTier {
        Free => "FREE",
        Pro => "PRO",
        Premium => "PREMIUM",
    }
}

impl SubscriptionTier {
    /// Search ranking weight; higher tiers sort first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Pro => 1,
            Self::Premium => 2,
        }
    }
}

string_enum! {
    pub enum VerificationStatus {
        Unverified => "UNVERIFIED",
        Pending => "PENDING",
        Verified => "VERIFIED",
        Rejected => "REJECTED",
    }
}

/// A public listing owned by one freelancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub verification_status: VerificationStatus,
    pub is_ai_agent: bool,
    pub ai_prompt: Option<String>,
    pub ai_price_cents: Option<i64>,
    pub rating_avg: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable part of a listing, as submitted by its owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessProfile {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub is_ai_agent: bool,
    pub ai_prompt: Option<String>,
    pub ai_price_cents: Option<i64>,
}

/// Data for inserting a listing.
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub owner_id: i64,
    pub slug: String,
    pub profile: BusinessProfile,
}

impl Business {
    /// Copy an owner's submitted profile onto this listing.
    pub fn apply_profile(&mut self, profile: BusinessProfile) {
        self.name = profile.name;
        self.description = profile.description;
        self.category = profile.category;
        self.city = profile.city;
        self.phone = profile.phone;
        self.website = profile.website;
        self.is_ai_agent = profile.is_ai_agent;
        self.ai_prompt = profile.ai_prompt;
        self.ai_price_cents = profile.ai_price_cents;
    }
}

/// A listing together with the services it offers.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    pub business: Business,
    pub services: Vec<Service>,
}

/// Search filters and pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSearch {
    /// Free text matched against name, description and category.
    pub q: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub verified_only: bool,
    pub ai_agents_only: bool,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for BusinessSearch {
    fn default() -> Self {
        Self {
            q: None,
            category: None,
            city: None,
            verified_only: false,
            ai_agents_only: false,
            page: 1,
            per_page: 20,
        }
    }
}

impl BusinessSearch {
    /// Largest page size a caller may request.
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamp pagination into the supported range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = self.per_page.clamp(1, Self::MAX_PER_PAGE);
        self.q = self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        self
    }

    /// Row offset for the current page.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)).saturating_mul(self.per_page)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// A bookable service offered by a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Create/update body for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
}

/// A rating left by a user on a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub business_id: i64,
    pub author_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub rating: i64,
    pub comment: Option<String>,
}

/// Data for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub business_id: i64,
    pub author_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_rank_orders_premium_first() {
        assert!(SubscriptionTier::Premium.rank() > SubscriptionTier::Pro.rank());
        assert!(SubscriptionTier::Pro.rank() > SubscriptionTier::Free.rank());
    }

    #[test]
    fn test_search_normalization_clamps_paging() {
        let search = BusinessSearch {
            page: 0,
            per_page: 500,
            q: Some("   ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(search.page, 1);
        assert_eq!(search.per_page, BusinessSearch::MAX_PER_PAGE);
        assert!(search.q.is_none());
        assert_eq!(search.offset(), 0);
    }

    #[test]
    fn test_search_offset() {
        let search = BusinessSearch {
            page: 3,
            per_page: 10,
            ..Default::default()
        };
        assert_eq!(search.offset(), 20);
    }
}

//! Marketplace configuration that services need but that is not a
//! runtime-editable platform setting.

use crate::domain::SubscriptionTier;

/// Default public URL used to build redirect links.
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

/// Static configuration handed to `AppCore` at composition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// Base URL of the public site, used for checkout and onboarding redirects.
    pub public_base_url: String,
    /// Recurring price id for the PRO tier at the payments provider.
    pub price_pro: Option<String>,
    /// Recurring price id for the PREMIUM tier at the payments provider.
    pub price_premium: Option<String>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_URL)
    }
}

impl MarketplaceConfig {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            price_pro: None,
            price_premium: None,
        }
    }

    /// Set the recurring price for a paid tier. `FREE` is ignored.
    #[must_use]
    pub fn with_price(mut self, tier: SubscriptionTier, price_id: impl Into<String>) -> Self {
        match tier {
            SubscriptionTier::Pro => self.price_pro = Some(price_id.into()),
            SubscriptionTier::Premium => self.price_premium = Some(price_id.into()),
            SubscriptionTier::Free => {}
        }
        self
    }

    #[must_use]
    pub fn price_for(&self, tier: SubscriptionTier) -> Option<&str> {
        match tier {
            SubscriptionTier::Pro => self.price_pro.as_deref(),
            SubscriptionTier::Premium => self.price_premium.as_deref(),
            SubscriptionTier::Free => None,
        }
    }

    /// Absolute URL for a site path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = MarketplaceConfig::new("https://mercato.example/");
        assert_eq!(
            config.url("/missions/3?payment=success"),
            "https://mercato.example/missions/3?payment=success"
        );
    }

    #[test]
    fn test_free_tier_has_no_price() {
        let config = MarketplaceConfig::default()
            .with_price(SubscriptionTier::Pro, "price_pro")
            .with_price(SubscriptionTier::Free, "ignored");
        assert_eq!(config.price_for(SubscriptionTier::Pro), Some("price_pro"));
        assert_eq!(config.price_for(SubscriptionTier::Premium), None);
        assert_eq!(config.price_for(SubscriptionTier::Free), None);
    }
}

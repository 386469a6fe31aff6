//! Server-side conversion tracking for the advertising pixel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mercato_core::{ConversionEvent, ConversionTrackerPort, ProviderError};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::ConversionsConfig;
use crate::http::{HttpBackend, HttpRequest, Method, endpoint};

pub struct ConversionsClient {
    backend: Arc<dyn HttpBackend>,
    config: ConversionsConfig,
}

impl ConversionsClient {
    pub fn new(backend: Arc<dyn HttpBackend>, config: ConversionsConfig) -> Self {
        Self { backend, config }
    }
}

/// Identifiers are sent hashed: SHA-256 of the trimmed, lowercased value.
fn hash_identifier(value: &str) -> String {
    hex::encode(Sha256::digest(value.trim().to_lowercase().as_bytes()))
}

fn event_payload(event: &ConversionEvent, event_time: i64) -> Value {
    let mut user_data = json!({});
    if let Some(email) = &event.email {
        user_data["em"] = json!([hash_identifier(email)]);
    }
    let mut payload = json!({
        "event_name": event.name,
        "event_time": event_time,
        "event_id": event.event_id,
        "action_source": "website",
        "user_data": user_data,
    });
    if let Some(cents) = event.value_cents {
        #[allow(clippy::cast_precision_loss)]
        let value = cents as f64 / 100.0;
        payload["custom_data"] = json!({
            "value": value,
            "currency": event.currency.as_deref().unwrap_or("eur"),
        });
    }
    payload
}

#[async_trait]
impl ConversionTrackerPort for ConversionsClient {
    async fn track(&self, event: &ConversionEvent) -> Result<(), ProviderError> {
        let (Some(pixel), Some(token)) = (&self.config.pixel_id, &self.config.access_token) else {
            return Err(ProviderError::NotConfigured(
                "conversions (CONVERSIONS_PIXEL_ID, CONVERSIONS_ACCESS_TOKEN)".into(),
            ));
        };

        let mut url = endpoint(&self.config.api_base, &format!("{pixel}/events"))?;
        url.query_pairs_mut().append_pair("access_token", token);
        let body = json!({"data": [event_payload(event, Utc::now().timestamp())]});
        self.backend
            .send(&HttpRequest::new(Method::Post, url).json(body))
            .await?;
        debug!(event = %event.name, event_id = %event.event_id, "Conversion tracked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use crate::http::testing::FakeBackend;

    fn purchase() -> ConversionEvent {
        ConversionEvent {
            name: "Purchase".to_string(),
            event_id: "sub-12".to_string(),
            email: Some("  Ana@Example.com ".to_string()),
            value_cents: Some(2_900),
            currency: Some("eur".to_string()),
        }
    }

    #[test]
    fn test_email_is_normalized_before_hashing() {
        assert_eq!(
            hash_identifier("  Ana@Example.com "),
            hash_identifier("ana@example.com")
        );
        assert_eq!(hash_identifier("x").len(), 64);
    }

    #[test]
    fn test_payload_shape() {
        let payload = event_payload(&purchase(), 1_700_000_000);
        assert_eq!(payload["event_name"], "Purchase");
        assert_eq!(payload["event_time"], 1_700_000_000);
        assert_eq!(payload["action_source"], "website");
        assert_eq!(payload["user_data"]["em"][0], hash_identifier("ana@example.com"));
        assert_eq!(payload["custom_data"]["value"], 29.0);

        let signup = ConversionEvent {
            name: "CompleteRegistration".to_string(),
            value_cents: None,
            email: None,
            ..purchase()
        };
        let payload = event_payload(&signup, 1);
        assert!(payload.get("custom_data").is_none());
        assert!(payload["user_data"].get("em").is_none());
    }

    #[tokio::test]
    async fn test_track_posts_to_pixel_endpoint() {
        let backend = Arc::new(FakeBackend::new().with_json("/px1/events", json!({"events_received": 1})));
        let client = ConversionsClient::new(
            backend.clone(),
            ConversionsConfig {
                api_base: "https://graph.example.com/v19.0".to_string(),
                pixel_id: Some("px1".to_string()),
                access_token: Some("tok".to_string()),
            },
        );

        client.track(&purchase()).await.unwrap();

        let request = backend.last_request();
        assert_eq!(
            request.url.as_str(),
            "https://graph.example.com/v19.0/px1/events?access_token=tok"
        );
        let Body::Json(body) = request.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["data"][0]["event_id"], "sub-12");
    }

    #[tokio::test]
    async fn test_disabled_tracker_is_not_configured() {
        let client = ConversionsClient::new(Arc::new(FakeBackend::new()), ConversionsConfig::default());
        let err = client.track(&purchase()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}

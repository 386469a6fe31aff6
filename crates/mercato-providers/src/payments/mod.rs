//! Payments provider client.
//!
//! Speaks the provider's form-encoded REST API for hosted checkout,
//! connected accounts and transfers, and verifies inbound webhooks.

mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mercato_core::{
    CheckoutMode, CheckoutRequest, CheckoutSession, PaymentGatewayPort, ProviderError,
    TransferRequest, WebhookEvent,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PaymentsConfig;
use crate::error::{ProviderHttpError, ProviderResult};
use crate::http::{HttpBackend, HttpRequest, HttpResponse, Method, endpoint};

pub use webhook::{parse_event, sign, verify_signature};

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    url: String,
}

pub struct PaymentsClient {
    backend: Arc<dyn HttpBackend>,
    config: PaymentsConfig,
}

impl PaymentsClient {
    pub fn new(backend: Arc<dyn HttpBackend>, config: PaymentsConfig) -> Self {
        Self { backend, config }
    }

    fn secret_key(&self) -> Result<&str, ProviderError> {
        self.config
            .secret_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("payments (PAYMENTS_SECRET_KEY)".into()))
    }

    async fn post_form(
        &self,
        path: &str,
        form: Vec<(String, String)>,
        idempotency_key: Option<&str>,
    ) -> Result<HttpResponse, ProviderError> {
        let key = self.secret_key()?;
        let url = endpoint(&self.config.api_base, path)?;
        let request = HttpRequest::new(Method::Post, url)
            .bearer(Some(key))
            .idempotency_key(idempotency_key)
            .form(form);
        Ok(self.backend.send(&request).await?)
    }
}

fn pair(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

/// Flatten a checkout request into the provider's bracketed form fields.
fn checkout_form(request: &CheckoutRequest) -> ProviderResult<Vec<(String, String)>> {
    let mut form = vec![
        pair("mode", request.mode.as_str()),
        pair("success_url", request.success_url.as_str()),
        pair("cancel_url", request.cancel_url.as_str()),
        pair("line_items[0][quantity]", "1"),
    ];
    if let Some(email) = &request.customer_email {
        form.push(pair("customer_email", email.as_str()));
    }

    match request.mode {
        CheckoutMode::Payment => {
            let amount = request
                .amount_cents
                .ok_or_else(|| ProviderHttpError::invalid("payment checkout needs an amount"))?;
            form.extend([
                pair("line_items[0][price_data][currency]", request.currency.as_str()),
                pair("line_items[0][price_data][unit_amount]", amount.to_string()),
                pair(
                    "line_items[0][price_data][product_data][name]",
                    request.description.as_str(),
                ),
            ]);
            for (key, value) in &request.metadata {
                form.push(pair(
                    format!("payment_intent_data[metadata][{key}]"),
                    value.as_str(),
                ));
            }
        }
        CheckoutMode::Subscription => {
            let price = request
                .price_id
                .as_deref()
                .ok_or_else(|| ProviderHttpError::invalid("subscription checkout needs a price"))?;
            form.push(pair("line_items[0][price]", price));
            for (key, value) in &request.metadata {
                form.push(pair(
                    format!("subscription_data[metadata][{key}]"),
                    value.as_str(),
                ));
            }
        }
    }

    for (key, value) in &request.metadata {
        form.push(pair(format!("metadata[{key}]"), value.as_str()));
    }
    Ok(form)
}

#[async_trait]
impl PaymentGatewayPort for PaymentsClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let form = checkout_form(request)?;
        let session: SessionResponse = self
            .post_form("checkout/sessions", form, None)
            .await?
            .json()?;
        let url = session
            .url
            .ok_or_else(|| ProviderError::InvalidResponse("checkout session has no url".into()))?;
        info!(session_id = %session.id, mode = request.mode.as_str(), "Checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_connected_account(&self, email: &str) -> Result<String, ProviderError> {
        let form = vec![
            pair("type", "express"),
            pair("email", email),
            pair("capabilities[transfers][requested]", "true"),
        ];
        let account: IdResponse = self.post_form("accounts", form, None).await?.json()?;
        Ok(account.id)
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, ProviderError> {
        let form = vec![
            pair("account", account_id),
            pair("refresh_url", refresh_url),
            pair("return_url", return_url),
            pair("type", "account_onboarding"),
        ];
        let link: LinkResponse = self.post_form("account_links", form, None).await?.json()?;
        Ok(link.url)
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError> {
        let form = vec![
            pair("amount", request.amount_cents.to_string()),
            pair("currency", request.currency.as_str()),
            pair("destination", request.destination.as_str()),
            pair("transfer_group", request.transfer_group.as_str()),
        ];
        let transfer: IdResponse = self
            .post_form("transfers", form, Some(&request.idempotency_key))
            .await?
            .json()?;
        info!(transfer_id = %transfer.id, amount_cents = request.amount_cents, "Transfer created");
        Ok(transfer.id)
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        let secret = self.config.webhook_secret.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("payment webhooks (PAYMENTS_WEBHOOK_SECRET)".into())
        })?;
        let tolerance = i64::try_from(self.config.webhook_tolerance.as_secs()).unwrap_or(i64::MAX);
        verify_signature(secret, payload, signature, Utc::now().timestamp(), tolerance)?;
        let event = parse_event(payload)?;
        debug!(event_id = %event.id, "Webhook signature verified");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeBackend;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn client(backend: Arc<FakeBackend>) -> PaymentsClient {
        let config = PaymentsConfig {
            api_base: "https://pay.example.com/v1".to_string(),
            secret_key: Some("sk_test".to_string()),
            webhook_secret: Some("whsec_test".to_string()),
            ..PaymentsConfig::default()
        };
        PaymentsClient::new(backend, config)
    }

    fn mission_checkout() -> CheckoutRequest {
        CheckoutRequest {
            mode: CheckoutMode::Payment,
            amount_cents: Some(12_500),
            currency: "eur".to_string(),
            description: "Mission #4: Logo".to_string(),
            price_id: None,
            customer_email: Some("client@example.com".to_string()),
            success_url: "https://mercato.test/ok".to_string(),
            cancel_url: "https://mercato.test/cancel".to_string(),
            metadata: BTreeMap::from([
                ("kind".to_string(), "mission".to_string()),
                ("mission_id".to_string(), "4".to_string()),
            ]),
        }
    }

    #[tokio::test]
    async fn test_checkout_posts_amount_and_metadata() {
        let backend = Arc::new(FakeBackend::new().with_json(
            "/checkout/sessions",
            json!({"id": "cs_1", "url": "https://pay.example.com/c/cs_1"}),
        ));
        let session = client(backend.clone())
            .create_checkout_session(&mission_checkout())
            .await
            .unwrap();

        assert_eq!(session.id, "cs_1");
        let request = backend.last_request();
        assert_eq!(
            request.url.as_str(),
            "https://pay.example.com/v1/checkout/sessions"
        );
        assert_eq!(request.bearer.as_deref(), Some("sk_test"));
        assert_eq!(request.form_value("mode"), Some("payment"));
        assert_eq!(
            request.form_value("line_items[0][price_data][unit_amount]"),
            Some("12500")
        );
        assert_eq!(request.form_value("metadata[mission_id]"), Some("4"));
    }

    #[test]
    fn test_subscription_checkout_uses_price() {
        let request = CheckoutRequest {
            mode: CheckoutMode::Subscription,
            amount_cents: None,
            price_id: Some("price_pro".to_string()),
            ..mission_checkout()
        };
        let form = checkout_form(&request).unwrap();
        assert!(form.contains(&pair("line_items[0][price]", "price_pro")));
        assert!(form.contains(&pair("subscription_data[metadata][kind]", "mission")));
        assert!(!form.iter().any(|(k, _)| k.contains("price_data")));

        let missing_price = CheckoutRequest {
            price_id: None,
            ..request
        };
        assert!(checkout_form(&missing_price).is_err());
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_configured() {
        let backend = Arc::new(FakeBackend::new());
        let client = PaymentsClient::new(backend.clone(), PaymentsConfig::default());
        let err = client.create_connected_account("f@example.com").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_rejection_maps_to_rejected() {
        let backend = Arc::new(FakeBackend::new().with_status("/transfers", 402));
        let err = client(backend)
            .create_transfer(&TransferRequest {
                amount_cents: 9_000,
                currency: "eur".to_string(),
                destination: "acct_1".to_string(),
                transfer_group: "mission-4".to_string(),
                idempotency_key: "payout-3".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 402, .. }));
    }

    #[tokio::test]
    async fn test_transfer_sends_idempotency_key() {
        let backend = Arc::new(FakeBackend::new().with_json("/transfers", json!({"id": "tr_1"})));
        let id = client(backend.clone())
            .create_transfer(&TransferRequest {
                amount_cents: 9_000,
                currency: "eur".to_string(),
                destination: "acct_1".to_string(),
                transfer_group: "mission-4".to_string(),
                idempotency_key: "payout-3".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(id, "tr_1");
        let request = backend.last_request();
        assert_eq!(request.idempotency_key.as_deref(), Some("payout-3"));
        assert!(request.is_replay_safe());
        assert_eq!(request.form_value("destination"), Some("acct_1"));
    }

    #[tokio::test]
    async fn test_account_link_returns_url() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_json("/account_links", json!({"url": "https://pay.example.com/onboard"})),
        );
        let url = client(backend.clone())
            .create_account_link("acct_1", "https://m.test/r", "https://m.test/d")
            .await
            .unwrap();
        assert_eq!(url, "https://pay.example.com/onboard");
        assert_eq!(
            backend.last_request().form_value("type"),
            Some("account_onboarding")
        );
    }

    #[test]
    fn test_parse_webhook_verifies_before_decoding() {
        let client = client(Arc::new(FakeBackend::new()));
        let payload = json!({
            "id": "evt_1",
            "type": "invoice.payment_failed",
            "data": {"object": {"customer": "cus_1"}}
        })
        .to_string();
        let now = Utc::now().timestamp();
        let header = format!(
            "t={now},v1={}",
            sign("whsec_test", now, payload.as_bytes()).unwrap()
        );

        let event = client.parse_webhook(payload.as_bytes(), &header).unwrap();
        assert_eq!(
            event.event,
            mercato_core::PaymentEvent::InvoicePaymentFailed {
                customer_id: "cus_1".to_string()
            }
        );

        let err = client
            .parse_webhook(payload.as_bytes(), "t=1,v1=00")
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature(_)));
    }
}

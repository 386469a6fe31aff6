//! Shared harness for router tests: in-memory database, fake providers
//! and small request helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use mercato_axum::{AxumContext, CorsConfig, create_router};
use mercato_core::{
    ChatCompletionPort, ChatTurn, CheckoutRequest, CheckoutSession, MarketplaceConfig,
    NoopConversionTracker, ObjectStoragePort, PaymentGatewayPort, ProviderError, Providers,
    StoredObject, SubscriptionTier, TransferRequest, WebhookEvent,
};
use mercato_db::{CoreFactory, TestDb};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Signature the fake gateway accepts.
pub const VALID_SIGNATURE: &str = "valid";

#[derive(Default)]
pub struct FakeGateway {
    pub transfers: Mutex<Vec<TransferRequest>>,
    pub next_event: Mutex<Option<WebhookEvent>>,
}

impl FakeGateway {
    pub fn queue(&self, event: WebhookEvent) {
        *self.next_event.lock().unwrap() = Some(event);
    }
}

#[async_trait]
impl PaymentGatewayPort for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        Ok(CheckoutSession {
            id: format!("cs_{}", request.mode.as_str()),
            url: "https://pay.test/cs".to_string(),
        })
    }

    async fn create_connected_account(&self, _email: &str) -> Result<String, ProviderError> {
        Ok("acct_1".to_string())
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("https://pay.test/onboard/{account_id}"))
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, ProviderError> {
        let mut transfers = self.transfers.lock().unwrap();
        transfers.push(request.clone());
        Ok(format!("tr_{}", transfers.len()))
    }

    fn parse_webhook(
        &self,
        _payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        if signature != VALID_SIGNATURE {
            return Err(ProviderError::InvalidSignature("mismatch".to_string()));
        }
        self.next_event
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::InvalidResponse("no event queued".to_string()))
    }
}

pub struct EchoChat;

#[async_trait]
impl ChatCompletionPort for EchoChat {
    async fn complete(&self, _model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        Ok(format!("echo: {}", turns.last().map_or("", |t| t.content.as_str())))
    }
}

pub struct NullStorage;

#[async_trait]
impl ObjectStoragePort for NullStorage {
    fn provider(&self) -> &str {
        "null"
    }

    async fn put(
        &self,
        key: &str,
        _bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, ProviderError> {
        Ok(StoredObject {
            url: format!("/media/{key}"),
        })
    }

    async fn delete(&self, _key: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
    pub db: TestDb,
}

/// A decoded response: status plus JSON body (`Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = TestDb::new().await.unwrap();
        let gateway = Arc::new(FakeGateway::default());
        let providers = Providers {
            payments: gateway.clone(),
            chat: Arc::new(EchoChat),
            storage: Arc::new(NullStorage),
            conversions: Arc::new(NoopConversionTracker),
        };
        let config = MarketplaceConfig::default().with_price(SubscriptionTier::Pro, "price_pro");
        let core = CoreFactory::build_app_core(db.pool().clone(), providers, config);
        let router = create_router(AxumContext::new(Arc::new(core)), &CorsConfig::AllowAll);
        Self {
            router,
            gateway,
            db,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register an account and return its session token and user id.
    pub async fn register(&self, email: &str, role: &str) -> (String, i64) {
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "correct horse",
                    "name": email,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        let token = response.body["token"].as_str().unwrap().to_string();
        let id = response.body["user"]["id"].as_i64().unwrap();
        (token, id)
    }

    /// Create the caller's listing and return its id.
    pub async fn create_listing(&self, token: &str, name: &str) -> i64 {
        let response = self
            .put(
                "/api/businesses/me",
                Some(token),
                json!({"name": name, "category": "design", "city": "Lisbon"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    /// Request a mission against `business_id` and return its id.
    pub async fn create_mission(&self, token: &str, business_id: i64, email: &str) -> i64 {
        let response = self
            .post(
                "/api/missions",
                Some(token),
                json!({
                    "business_id": business_id,
                    "client_email": email,
                    "title": "Logo",
                    "description": "A new logo",
                    "budget_cents": 20_000,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    /// Deliver a webhook with the given signature.
    pub async fn webhook(&self, signature: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/payments")
            .header("stripe-signature", signature)
            .body(Body::from("{}"))
            .unwrap();
        self.send(request).await
    }
}

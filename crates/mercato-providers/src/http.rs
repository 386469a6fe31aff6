//! HTTP backend abstraction shared by the provider clients.
//!
//! Clients describe requests as plain [`HttpRequest`] values and hand them
//! to an [`HttpBackend`]. The production backend uses reqwest and retries
//! transient failures (5xx and network errors) with exponential backoff;
//! tests swap in the in-memory fake from [`testing`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{ProviderHttpError, ProviderResult};

// ============================================================================
// Request / response values
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` pairs, in order.
    Form(Vec<(String, String)>),
    Bytes { data: Vec<u8>, content_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub bearer: Option<String>,
    /// Sent as `Idempotency-Key`; makes a POST safe to replay.
    pub idempotency_key: Option<String>,
    pub body: Body,
}

impl HttpRequest {
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            bearer: None,
            idempotency_key: None,
            body: Body::Empty,
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: Option<&str>) -> Self {
        self.idempotency_key = key.map(str::to_string);
        self
    }

    /// Whether resending after a lost response cannot repeat a side effect.
    pub fn is_replay_safe(&self) -> bool {
        self.method != Method::Post || self.idempotency_key.is_some()
    }

    #[must_use]
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    #[must_use]
    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Body::Form(pairs);
        self
    }

    #[must_use]
    pub fn bytes(mut self, data: &[u8], content_type: &str) -> Self {
        self.body = Body::Bytes {
            data: data.to_vec(),
            content_type: content_type.to_string(),
        };
        self
    }

    /// Value of a form field, if this is a form request.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            Body::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }
}

/// Join a relative path onto an API base without dropping the base's path.
pub fn endpoint(base: &str, path: &str) -> ProviderResult<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(Into::into)
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Send a request. Non-2xx answers are returned as
    /// [`ProviderHttpError::Status`].
    async fn send(&self, request: &HttpRequest) -> ProviderResult<HttpResponse>;
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_base_delay,
        }
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// Network errors are retried only when `replay_safe`: the provider may
/// have acted on a request whose response was lost.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    replay_safe: bool,
    mut op: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt: u8 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient(replay_safe) && attempt < policy.max_attempts => {
                let delay = policy.delay_for(u32::from(attempt));
                warn!(
                    endpoint = what,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
pub struct ReqwestBackend {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestBackend {
    pub fn new(config: &HttpConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy::from_config(config),
        })
    }

    async fn send_once(&self, request: &HttpRequest) -> ProviderResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, request.url.clone());
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(pairs) => builder.form(pairs),
            Body::Bytes { data, content_type } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data.clone()),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(url = %request.url, status = status.as_u16(), "Provider response");

        if status.is_success() {
            return Ok(HttpResponse {
                status: status.as_u16(),
                body,
            });
        }
        Err(ProviderHttpError::Status {
            status: status.as_u16(),
            url: request.url.to_string(),
            message: error_message(&body),
        })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: &HttpRequest) -> ProviderResult<HttpResponse> {
        let what = request.url.path().to_string();
        with_retry(&self.retry, &what, request.is_replay_safe(), || {
            self.send_once(request)
        })
        .await
    }
}

/// Best-effort error text from a provider error body.
///
/// Understands `{"error": {"message": ..}}` and `{"error": ".."}`; anything
/// else is returned as (truncated) text.
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let error = &value["error"];
        if let Some(message) = error["message"].as_str().or_else(|| error.as_str()) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    text.chars().take(200).collect::<String>().trim().to_string()
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A fake HTTP backend that records requests and replays canned answers.
    ///
    /// Answers are matched by URL substring in registration order; each
    /// registered answer is used once unless it is the last one for its
    /// pattern.
    #[derive(Default)]
    pub struct FakeBackend {
        answers: Mutex<Vec<(String, VecDeque<Result<serde_json::Value, u16>>)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer requests whose URL contains `pattern` with a 200 JSON body.
        pub fn with_json(self, pattern: &str, json: serde_json::Value) -> Self {
            self.push(pattern, Ok(json));
            self
        }

        /// Answer requests whose URL contains `pattern` with an error status.
        pub fn with_status(self, pattern: &str, status: u16) -> Self {
            self.push(pattern, Err(status));
            self
        }

        fn push(&self, pattern: &str, answer: Result<serde_json::Value, u16>) {
            let mut answers = self.answers.lock().unwrap();
            if let Some((_, queue)) = answers.iter_mut().find(|(p, _)| p == pattern) {
                queue.push_back(answer);
            } else {
                answers.push((pattern.to_string(), VecDeque::from([answer])));
            }
        }

        /// Every request sent so far.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_request(&self) -> HttpRequest {
            self.requests
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no request was sent")
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn send(&self, request: &HttpRequest) -> ProviderResult<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let url = request.url.to_string();

            let answer = {
                let mut answers = self.answers.lock().unwrap();
                answers
                    .iter_mut()
                    .find(|(pattern, _)| url.contains(pattern.as_str()))
                    .and_then(|(_, queue)| {
                        if queue.len() > 1 {
                            queue.pop_front()
                        } else {
                            queue.front().cloned()
                        }
                    })
            };

            match answer {
                Some(Ok(json)) => Ok(HttpResponse {
                    status: 200,
                    body: serde_json::to_vec(&json)?,
                }),
                Some(Err(status)) => Err(ProviderHttpError::Status {
                    status,
                    url,
                    message: "canned failure".to_string(),
                }),
                None => Err(ProviderHttpError::Status {
                    status: 404,
                    url,
                    message: "no canned answer".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u8) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    fn server_error() -> ProviderHttpError {
        ProviderHttpError::Status {
            status: 503,
            url: "https://api.example.com".to_string(),
            message: "busy".to_string(),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_policy(3), "test", true, || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(server_error())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: ProviderResult<()> = with_retry(&fast_policy(3), "test", true, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(server_error())
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: ProviderResult<()> = with_retry(&fast_policy(3), "test", true, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ProviderHttpError::Status {
                status: 400,
                url: "https://api.example.com".to_string(),
                message: "bad".to_string(),
            })
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_posts_are_not_replay_safe() {
        let url = Url::parse("https://api.example.com/transfers").unwrap();
        assert!(HttpRequest::new(Method::Get, url.clone()).is_replay_safe());
        assert!(HttpRequest::new(Method::Put, url.clone()).is_replay_safe());
        assert!(!HttpRequest::new(Method::Post, url.clone()).is_replay_safe());
        assert!(
            HttpRequest::new(Method::Post, url)
                .idempotency_key(Some("payout-1"))
                .is_replay_safe()
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(br#"{"error":{"message":"No such customer"}}"#),
            "No such customer"
        );
        assert_eq!(error_message(br#"{"error":"unauthorized"}"#), "unauthorized");
        assert_eq!(error_message(b"Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = endpoint("https://api.example.com/v1/", "/checkout/sessions").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/checkout/sessions");
        assert!(endpoint("not a url", "x").is_err());
    }

    #[test]
    fn test_reqwest_backend_creation() {
        let backend = ReqwestBackend::new(&HttpConfig::default()).unwrap();
        assert_eq!(backend.retry.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_fake_backend_replays_in_order() {
        let backend = FakeBackend::new()
            .with_status("/things", 500)
            .with_json("/things", json!({"ok": true}));
        let url = Url::parse("https://api.example.com/things").unwrap();
        let request = HttpRequest::new(Method::Get, url);

        assert!(backend.send(&request).await.is_err());
        let response = backend.send(&request).await.unwrap();
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);
        // Last answer sticks.
        assert!(backend.send(&request).await.is_ok());
        assert_eq!(backend.requests().len(), 3);
    }
}

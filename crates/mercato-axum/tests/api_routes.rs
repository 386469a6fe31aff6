//! Router-level tests: handlers, extractors and error mapping wired over
//! an in-memory database with fake providers.

mod common;

use std::collections::BTreeMap;

use axum::http::{StatusCode, header};
use mercato_core::services::{
    KIND_MISSION, KIND_SUBSCRIPTION, METADATA_KIND, METADATA_MISSION_ID, METADATA_TIER,
    METADATA_USER_ID,
};
use mercato_core::{MissionRepository, MissionStatus, PaymentEvent, WebhookEvent};
use serde_json::json;

use common::{TestApp, VALID_SIGNATURE};

fn checkout_completed(id: &str, metadata: BTreeMap<String, String>) -> WebhookEvent {
    WebhookEvent {
        id: id.to_string(),
        event: PaymentEvent::CheckoutCompleted {
            session_id: format!("cs_{id}"),
            customer_id: Some("cus_1".to_string()),
            amount_total: Some(20_000),
            currency: Some("eur".to_string()),
            metadata,
        },
    }
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
}

#[tokio::test]
async fn me_requires_a_session() {
    let app = TestApp::new().await;

    let response = app.get("/api/auth/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], 401);
    assert_eq!(response.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let response = app.get("/api/auth/me", Some("not-a-session")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let (token, id) = app.register("ana@example.com", "FREELANCER").await;
    let response = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);
    assert!(response.body.get("password_hash").is_none());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@example.com", "CLIENT").await;

    let response = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mission_without_client_email_is_rejected() {
    let app = TestApp::new().await;
    let (freelancer, _) = app.register("f@example.com", "FREELANCER").await;
    let (client, _) = app.register("c@example.com", "CLIENT").await;
    let listing = app.create_listing(&freelancer, "Studio Ana").await;

    let response = app
        .post(
            "/api/missions",
            Some(&client),
            json!({
                "business_id": listing,
                "title": "Logo",
                "description": "A new logo",
                "budget_cents": 20_000,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["fields"]["client_email"], "is required");
}

#[tokio::test]
async fn only_the_client_can_release_funds() {
    let app = TestApp::new().await;
    let (freelancer, _) = app.register("f@example.com", "FREELANCER").await;
    let (client, _) = app.register("c@example.com", "CLIENT").await;
    let listing = app.create_listing(&freelancer, "Studio Ana").await;
    let mission = app.create_mission(&client, listing, "c@example.com").await;

    let uri = format!("/api/missions/{mission}/release");
    let response = app.post(&uri, Some(&freelancer), json!({})).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // The client is allowed in, but a pending mission cannot be released.
    let response = app.post(&uri, Some(&client), json!({})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body["error"].as_str().unwrap().contains("PENDING"));
}

#[tokio::test]
async fn release_needs_a_held_payment() {
    let app = TestApp::new().await;
    let (freelancer, _) = app.register("f@example.com", "FREELANCER").await;
    let (client, _) = app.register("c@example.com", "CLIENT").await;
    let listing = app.create_listing(&freelancer, "Studio Ana").await;
    let mission = app.create_mission(&client, listing, "c@example.com").await;
    let uri = format!("/api/missions/{mission}/release");

    for status in [MissionStatus::InProgress, MissionStatus::Delivered] {
        app.db
            .mission_repository()
            .set_status(mission, status)
            .await
            .unwrap();
        let response = app.post(&uri, Some(&client), json!({})).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.body["error"], "mission has no held payment");
    }
    assert!(app.gateway.transfers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_confirmed_after_cancel_stays_releasable() {
    let app = TestApp::new().await;
    let (freelancer, _) = app.register("f@example.com", "FREELANCER").await;
    let (client, _) = app.register("c@example.com", "CLIENT").await;
    let listing = app.create_listing(&freelancer, "Studio Ana").await;
    let mission = app.create_mission(&client, listing, "c@example.com").await;

    let response = app
        .post(&format!("/api/missions/{mission}/pay"), Some(&client), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app
        .post(
            &format!("/api/missions/{mission}/status"),
            Some(&freelancer),
            json!({"status": "CANCELLED"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    app.gateway.queue(checkout_completed(
        "evt_late",
        BTreeMap::from([
            (METADATA_KIND.to_string(), KIND_MISSION.to_string()),
            (METADATA_MISSION_ID.to_string(), mission.to_string()),
        ]),
    ));
    let response = app.webhook(VALID_SIGNATURE).await;
    assert_eq!(response.body["outcome"], "mission_funded");

    let response = app
        .get(&format!("/api/missions/{mission}"), Some(&client))
        .await;
    assert_eq!(response.body["status"], "IN_PROGRESS");
    assert_eq!(response.body["payment"]["status"], "HELD");
}

#[tokio::test]
async fn paid_checkout_moves_mission_in_progress() {
    let app = TestApp::new().await;
    let (freelancer, _) = app.register("f@example.com", "FREELANCER").await;
    let (client, _) = app.register("c@example.com", "CLIENT").await;
    let listing = app.create_listing(&freelancer, "Studio Ana").await;
    let mission = app.create_mission(&client, listing, "c@example.com").await;

    let response = app
        .post(&format!("/api/missions/{mission}/pay"), Some(&client), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["url"], "https://pay.test/cs");

    app.gateway.queue(checkout_completed(
        "evt_1",
        BTreeMap::from([
            (METADATA_KIND.to_string(), KIND_MISSION.to_string()),
            (METADATA_MISSION_ID.to_string(), mission.to_string()),
        ]),
    ));
    let response = app.webhook(VALID_SIGNATURE).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "mission_funded");

    let response = app.webhook(VALID_SIGNATURE).await;
    assert_eq!(response.body["outcome"], "duplicate");

    let response = app
        .get(&format!("/api/missions/{mission}"), Some(&freelancer))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "IN_PROGRESS");
    assert_eq!(response.body["payment"]["status"], "HELD");
}

#[tokio::test]
async fn subscription_checkout_webhook_activates_plan() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("f@example.com", "FREELANCER").await;

    let response = app
        .post("/api/subscriptions/checkout", Some(&token), json!({"tier": "PRO"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    app.gateway.queue(checkout_completed(
        "evt_sub",
        BTreeMap::from([
            (METADATA_KIND.to_string(), KIND_SUBSCRIPTION.to_string()),
            (METADATA_USER_ID.to_string(), user_id.to_string()),
            (METADATA_TIER.to_string(), "PRO".to_string()),
        ]),
    ));
    let response = app.webhook(VALID_SIGNATURE).await;
    assert_eq!(response.body["outcome"], "subscription_activated");

    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.body["subscription_status"], "ACTIVE");
    assert_eq!(me.body["subscription_plan"], "PRO");
}

#[tokio::test]
async fn webhook_signature_is_enforced() {
    let app = TestApp::new().await;

    let response = app.webhook("forged").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/webhooks/payments")
        .body(axum::body::Body::from("{}"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_workspace_rows_are_not_found() {
    let app = TestApp::new().await;
    let (owner, _) = app.register("owner@example.com", "FREELANCER").await;
    let (other, _) = app.register("other@example.com", "FREELANCER").await;

    let response = app
        .post("/api/workspace/tasks", Some(&owner), json!({"title": "Sketch"}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let task = response.body["id"].as_i64().unwrap();
    let uri = format!("/api/workspace/tasks/{task}");

    assert_eq!(app.delete(&uri, Some(&other)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, Some(&other)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&owner)).await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn timer_start_and_stop() {
    let app = TestApp::new().await;
    let (token, _) = app.register("owner@example.com", "FREELANCER").await;

    let response = app
        .request(
            axum::http::Method::POST,
            "/api/workspace/time-entries/start",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let entry = response.body["id"].as_i64().unwrap();
    assert!(response.body["ended_at"].is_null());

    let again = app
        .post(
            "/api/workspace/time-entries/start",
            Some(&token),
            json!({"description": "second"}),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let stopped = app
        .post(
            &format!("/api/workspace/time-entries/{entry}/stop"),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(stopped.status, StatusCode::OK);
    assert!(!stopped.body["ended_at"].is_null());
}

#[tokio::test]
async fn malformed_json_bodies_get_the_error_envelope() {
    let app = TestApp::new().await;
    let (token, _) = app.register("owner@example.com", "FREELANCER").await;

    let response = app
        .post("/api/workspace/events", Some(&token), json!({"title": "x"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], 400);
    assert!(response.body["error"].as_str().unwrap().contains("starts_at"));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/workspace/tasks")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], 400);
}

#[tokio::test]
async fn oversized_invoice_lines_are_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.register("owner@example.com", "FREELANCER").await;
    let response = app
        .post("/api/workspace/clients", Some(&token), json!({"name": "Acme"}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let client = response.body["id"].as_i64().unwrap();

    let line = json!({
        "description": "Work",
        "quantity": 1.0,
        "unit_price_cents": 5_000_000_000_000_000_000_i64,
    });
    let response = app
        .post(
            "/api/workspace/invoices",
            Some(&token),
            json!({"client_id": client, "items": [line.clone(), line]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["items"].is_string());

    let listed = app.get("/api/workspace/invoices", Some(&token)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().map(Vec::len), Some(0));
    let summary = app.get("/api/workspace/summary", Some(&token)).await;
    assert_eq!(summary.status, StatusCode::OK);
    assert_eq!(summary.body["outstanding_invoice_cents"], 0);
}

#[tokio::test]
async fn settings_are_admin_only() {
    let app = TestApp::new().await;
    let (token, _) = app.register("f@example.com", "FREELANCER").await;

    let response = app.get("/api/admin/settings", Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

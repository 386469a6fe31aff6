//! Route definitions and router construction.
//!
//! Axum 0.8 uses brace syntax for path parameters: `{id}`.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Request body ceiling for `/uploads`. The configured per-file limit is
/// enforced by the media service underneath this.
pub const UPLOAD_BODY_LIMIT: usize = 101 * 1024 * 1024;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// All API routes without the `/api` prefix and without state applied.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        // Listings
        .route("/businesses", get(handlers::businesses::search))
        .route(
            "/businesses/me",
            get(handlers::businesses::mine).put(handlers::businesses::upsert_mine),
        )
        .route(
            "/businesses/me/verification",
            post(handlers::businesses::request_verification),
        )
        .route("/businesses/{id}", get(handlers::businesses::detail))
        .route(
            "/businesses/{id}/services",
            get(handlers::businesses::list_services),
        )
        .route(
            "/businesses/{id}/reviews",
            get(handlers::businesses::list_reviews).post(handlers::businesses::add_review),
        )
        .route("/services", post(handlers::businesses::create_service))
        .route(
            "/services/{id}",
            put(handlers::businesses::update_service).delete(handlers::businesses::delete_service),
        )
        // Missions and escrow
        .route(
            "/missions",
            get(handlers::missions::list).post(handlers::missions::create),
        )
        .route("/missions/{id}", get(handlers::missions::get))
        .route("/missions/{id}/status", post(handlers::missions::update_status))
        .route(
            "/missions/{id}/messages",
            get(handlers::missions::messages).post(handlers::missions::post_message),
        )
        .route("/missions/{id}/pay", post(handlers::missions::pay))
        .route("/missions/{id}/release", post(handlers::missions::release))
        // Payments
        .route("/payments/connect", post(handlers::payments::connect))
        .route(
            "/subscriptions/checkout",
            post(handlers::payments::subscription_checkout),
        )
        .route("/webhooks/payments", post(handlers::payments::webhook))
        // Agents
        .route("/agents/{business_id}/chat", post(handlers::agents::chat))
        .route(
            "/agents/conversations/{id}",
            get(handlers::agents::transcript),
        )
        // Uploads
        .route(
            "/uploads",
            post(handlers::media::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/media", get(handlers::media::list))
        .route("/media/{id}", delete(handlers::media::delete))
        // Admin
        .route(
            "/admin/settings",
            get(handlers::admin::get_settings).put(handlers::admin::update_settings),
        )
        .route(
            "/admin/businesses/{id}/verification",
            put(handlers::admin::set_verification),
        )
        .merge(workspace_routes())
}

/// Workspace CRM routes.
fn workspace_routes() -> Router<AppState> {
    use handlers::workspace as ws;

    Router::new()
        .route(
            "/workspace/clients",
            get(ws::list_clients).post(ws::create_client),
        )
        .route(
            "/workspace/clients/{id}",
            get(ws::get_client)
                .put(ws::update_client)
                .delete(ws::delete_client),
        )
        .route(
            "/workspace/projects",
            get(ws::list_projects).post(ws::create_project),
        )
        .route(
            "/workspace/projects/{id}",
            get(ws::get_project)
                .put(ws::update_project)
                .delete(ws::delete_project),
        )
        .route("/workspace/tasks", get(ws::list_tasks).post(ws::create_task))
        .route(
            "/workspace/tasks/{id}",
            get(ws::get_task).put(ws::update_task).delete(ws::delete_task),
        )
        .route(
            "/workspace/invoices",
            get(ws::list_invoices).post(ws::create_invoice),
        )
        .route(
            "/workspace/invoices/{id}",
            get(ws::get_invoice)
                .put(ws::update_invoice)
                .delete(ws::delete_invoice),
        )
        .route(
            "/workspace/invoices/{id}/status",
            post(ws::set_invoice_status),
        )
        .route(
            "/workspace/time-entries",
            get(ws::list_time_entries).post(ws::create_time_entry),
        )
        .route("/workspace/time-entries/start", post(ws::start_timer))
        .route(
            "/workspace/time-entries/{id}",
            get(ws::get_time_entry)
                .put(ws::update_time_entry)
                .delete(ws::delete_time_entry),
        )
        .route("/workspace/time-entries/{id}/stop", post(ws::stop_timer))
        .route(
            "/workspace/events",
            get(ws::list_events).post(ws::create_event),
        )
        .route(
            "/workspace/events/{id}",
            get(ws::get_event).put(ws::update_event).delete(ws::delete_event),
        )
        .route("/workspace/summary", get(ws::summary))
}

/// Create the main Axum router: `/health`, the API under `/api` and, when
/// uploads are stored locally, the upload directory as static files.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let media = ctx.local_media.clone();
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors));

    if let Some(media) = media {
        router = router.nest_service(&media.public_path, ServeDir::new(media.dir));
    }
    router.layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}

//! Listing handlers - search, detail, services and reviews.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use mercato_core::{
    Business, BusinessDetail, BusinessProfile, BusinessSearch, Review, ReviewInput, SearchPage,
    Service, ServiceInput,
};

use crate::auth::CurrentUser;
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Public search with filters and pagination.
pub async fn search(
    State(state): State<AppState>,
    Query(search): Query<BusinessSearch>,
) -> Result<Json<SearchPage<Business>>, HttpError> {
    Ok(Json(state.core.businesses().search(search).await?))
}

/// A listing with its services, by numeric id or slug.
pub async fn detail(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<BusinessDetail>, HttpError> {
    Ok(Json(state.core.businesses().detail(&id_or_slug).await?))
}

/// The caller's own listing; `null` when none exists yet.
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Option<Business>>, HttpError> {
    Ok(Json(state.core.businesses().mine(&user).await?))
}

/// Create or update the caller's listing.
pub async fn upsert_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(profile): Json<BusinessProfile>,
) -> Result<Json<Business>, HttpError> {
    Ok(Json(state.core.businesses().upsert_mine(&user, profile).await?))
}

pub async fn request_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Business>, HttpError> {
    Ok(Json(state.core.businesses().request_verification(&user).await?))
}

pub async fn list_services(
    State(state): State<AppState>,
    Path(business_id): Path<i64>,
) -> Result<Json<Vec<Service>>, HttpError> {
    Ok(Json(state.core.businesses().list_services(business_id).await?))
}

/// Add a service to the caller's listing.
pub async fn create_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ServiceInput>,
) -> Result<(StatusCode, Json<Service>), HttpError> {
    let service = state.core.businesses().create_service(&user, input).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<ServiceInput>,
) -> Result<Json<Service>, HttpError> {
    Ok(Json(
        state.core.businesses().update_service(&user, id, input).await?,
    ))
}

pub async fn delete_service(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.businesses().delete_service(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(business_id): Path<i64>,
) -> Result<Json<Vec<Review>>, HttpError> {
    Ok(Json(state.core.businesses().list_reviews(business_id).await?))
}

/// Review a listing; one review per author and listing.
pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<i64>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>), HttpError> {
    let review = state
        .core
        .businesses()
        .add_review(&user, business_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

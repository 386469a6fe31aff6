//! Account handlers - registration, login and session lookup.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use mercato_core::{AuthSession, LoginRequest, RegisterRequest, User};

use crate::auth::{CurrentUser, bearer_token};
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Create an account and open a session.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>), HttpError> {
    let session = state.core.auth().register(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthSession>, HttpError> {
    Ok(Json(state.core.auth().login(req).await?))
}

/// End the presented session. Unknown tokens are not an error.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| HttpError::Unauthorized("missing bearer token".to_string()))?;
    state.core.auth().logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

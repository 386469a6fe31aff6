//! Admin handlers - platform settings and listing verification.

use axum::extract::{Path, State};
use mercato_core::{Business, PlatformSettings, PlatformSettingsUpdate};

use crate::auth::AdminUser;
use crate::dto::VerificationDecision;
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<PlatformSettings>, HttpError> {
    Ok(Json(state.core.settings().get().await?))
}

/// Apply a partial settings update; the merged result is validated.
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(update): Json<PlatformSettingsUpdate>,
) -> Result<Json<PlatformSettings>, HttpError> {
    Ok(Json(state.core.settings().update(&admin, update).await?))
}

pub async fn set_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(decision): Json<VerificationDecision>,
) -> Result<Json<Business>, HttpError> {
    Ok(Json(
        state
            .core
            .businesses()
            .set_verification(&admin, id, decision.status)
            .await?,
    ))
}

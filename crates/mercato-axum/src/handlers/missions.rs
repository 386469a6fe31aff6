//! Mission handlers - requests, status changes, threads and escrow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use mercato_core::{
    CreateMission, MissionMessage, MissionMessageInput, MissionRequest, MissionStatusUpdate,
    MissionView, Payment,
};

use crate::auth::CurrentUser;
use crate::dto::{CheckoutResponse, MissionListQuery};
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Request a mission from a listing.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateMission>,
) -> Result<(StatusCode, Json<MissionRequest>), HttpError> {
    let mission = state.core.missions().create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(mission)))
}

/// Missions the caller takes part in, as client or as freelancer.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MissionListQuery>,
) -> Result<Json<Vec<MissionRequest>>, HttpError> {
    Ok(Json(state.core.missions().list(&user, query.party).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MissionView>, HttpError> {
    Ok(Json(state.core.missions().get(&user, id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<MissionStatusUpdate>,
) -> Result<Json<MissionRequest>, HttpError> {
    Ok(Json(
        state
            .core
            .missions()
            .update_status(&user, id, update.status)
            .await?,
    ))
}

pub async fn messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MissionMessage>>, HttpError> {
    Ok(Json(state.core.missions().messages(&user, id).await?))
}

pub async fn post_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<MissionMessageInput>,
) -> Result<(StatusCode, Json<MissionMessage>), HttpError> {
    let message = state.core.missions().post_message(&user, id, input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Start the escrow checkout for a pending mission.
pub async fn pay(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CheckoutResponse>, HttpError> {
    let session = state.core.escrow().request_payment(&user, id).await?;
    Ok(Json(session.into()))
}

/// Pay the held funds out to the freelancer. Client only.
pub async fn release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Payment>, HttpError> {
    Ok(Json(state.core.escrow().release(&user, id).await?))
}

//! AI-agent concierge handlers.

use axum::extract::{Path, State};
use mercato_core::{AgentChatRequest, AgentReply, AgentTranscript};

use crate::auth::MaybeUser;
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Send a visitor message to a listing's agent. Anonymous visitors are allowed.
pub async fn chat(
    State(state): State<AppState>,
    MaybeUser(visitor): MaybeUser,
    Path(business_id): Path<i64>,
    Json(req): Json<AgentChatRequest>,
) -> Result<Json<AgentReply>, HttpError> {
    Ok(Json(
        state
            .core
            .agents()
            .chat(visitor.as_ref(), business_id, req)
            .await?,
    ))
}

pub async fn transcript(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<AgentTranscript>, HttpError> {
    Ok(Json(
        state.core.agents().transcript(viewer.as_ref(), id).await?,
    ))
}

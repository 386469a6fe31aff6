//! Upload handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use mercato_core::{Media, UploadedFile};

use crate::auth::CurrentUser;
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

/// Multipart field holding the file.
const FILE_FIELD: &str = "file";

/// Store the multipart `file` field for the caller.
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), HttpError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HttpError::BadRequest(e.body_text()))?;

        let media = state
            .core
            .media()
            .upload(
                &user,
                UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            )
            .await?;
        return Ok((StatusCode::CREATED, Json(media)));
    }
    Err(HttpError::Validation(
        [(FILE_FIELD.to_string(), "is required".to_string())].into(),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Media>>, HttpError> {
    Ok(Json(state.core.media().list(&user).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.media().delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

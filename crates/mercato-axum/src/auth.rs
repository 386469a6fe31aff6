//! Session extractors.
//!
//! Handlers take [`CurrentUser`] when a session is required,
//! [`MaybeUser`] when it is optional and [`AdminUser`] for admin routes.
//! Sessions are presented as `Authorization: Bearer {token}`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use mercato_core::{User, UserRole};

use crate::error::HttpError;
use crate::state::AppState;

/// Raw bearer token from the request, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// The authenticated caller. Rejects with 401 without a valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| HttpError::Unauthorized("missing bearer token".to_string()))?;
        let user = state.core.auth().authenticate(token).await?;
        Ok(Self(user))
    }
}

/// The caller if a valid session was presented.
///
/// A missing header yields `None`; a present but invalid token is still
/// rejected so clients notice expired sessions.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            None => Ok(Self(None)),
            Some(token) => Ok(Self(Some(state.core.auth().authenticate(token).await?))),
        }
    }
}

/// An authenticated caller with the `ADMIN` role (403 otherwise).
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(HttpError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(user))
    }
}

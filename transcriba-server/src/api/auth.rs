//! Access token extractors
//!
//! The token is read from the `access_token` query parameter or the
//! `Authorization` header, either raw or as `Bearer <token>`. Expired tokens
//! are deleted on first use.

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use transcriba_common::config::ADMIN_ROLE;
use transcriba_common::db::{tokens, users};
use transcriba_common::models::{AccessToken, AppUser};
use transcriba_common::{Error, Result};

use crate::error::ApiError;
use crate::services::rbac;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Token presented with the request, if any
pub fn presented_token(parts: &Parts) -> Option<String> {
    if let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(&parts.uri) {
        if let Some(token) = query.access_token.filter(|t| !t.is_empty()) {
            return Some(token);
        }
    }
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn authenticate(state: &AppState, token_id: &str) -> Result<(AppUser, AccessToken)> {
    let token = tokens::find(&state.db, token_id)
        .await?
        .ok_or_else(|| Error::Unauthorized("invalid access token".to_string()))?;
    if token.is_expired(Utc::now()) {
        debug!("Dropping expired token of user {}", token.user_id);
        tokens::delete(&state.db, &token.id).await?;
        return Err(Error::Unauthorized("access token expired".to_string()));
    }
    let user = users::find_by_id(&state.db, &token.user_id)
        .await?
        .ok_or_else(|| Error::Unauthorized("unknown user".to_string()))?;
    Ok((user, token))
}

/// Authenticated user; rejects the request with 401 otherwise
pub struct CurrentUser {
    pub user: AppUser,
    pub token: AccessToken,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let token = presented_token(parts)
            .ok_or_else(|| Error::Unauthorized("access token required".to_string()))?;
        let (user, token) = authenticate(state, &token).await?;
        Ok(Self { user, token })
    }
}

/// Authenticated user if a valid token was presented
pub struct MaybeUser(pub Option<AppUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let Some(token) = presented_token(parts) else {
            return Ok(Self(None));
        };
        match authenticate(state, &token).await {
            Ok((user, _)) => Ok(Self(Some(user))),
            Err(Error::Unauthorized(_)) => Ok(Self(None)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Authenticated administrator; other users get 403
pub struct AdminUser(pub AppUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if !rbac::has_role(&state.db, &user.id, ADMIN_ROLE).await? {
            return Err(Error::Forbidden.into());
        }
        Ok(Self(user))
    }
}

//! /api/AppUsers endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use transcriba_common::db::users::LeaderboardEntry;
use transcriba_common::models::{AccessToken, AppUser, Role};
use transcriba_common::Error;

use super::{AdminUser, ApiJson, ApiQuery, CurrentUser};
use crate::error::ApiResult;
use crate::services::{rbac, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub uid: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub max_num_of_users: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

/// POST /api/AppUsers
pub async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<users::Registration>,
) -> ApiResult<Json<AppUser>> {
    Ok(Json(users::register(&state.db, registration).await?))
}

/// GET /api/AppUsers/confirm?uid&token
pub async fn confirm(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ConfirmQuery>,
) -> ApiResult<Json<Value>> {
    let (Some(uid), Some(token)) = (query.uid, query.token) else {
        return Err(Error::WrongInput("uid and token".to_string()).into());
    };
    users::confirm(&state.db, &state.config, &uid, &token).await?;
    Ok(Json(json!({ "confirmed": true })))
}

/// POST /api/AppUsers/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<users::Credentials>,
) -> ApiResult<Json<AccessToken>> {
    Ok(Json(users::login(&state.db, &state.config, credentials).await?))
}

/// POST /api/AppUsers/logout
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> ApiResult<StatusCode> {
    users::logout(&state.db, &current.token.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/AppUsers/score
pub async fn score(current: CurrentUser) -> Json<Value> {
    Json(json!({ "score": current.user.score }))
}

/// GET /api/AppUsers/busy
pub async fn busy(current: CurrentUser) -> Json<Value> {
    Json(json!({ "busy": current.user.busy }))
}

/// GET /api/AppUsers/leaderboard?maxNumOfUsers
pub async fn leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(users::leaderboard(&state.db, query.max_num_of_users).await?))
}

/// POST /api/AppUsers/tutorial
pub async fn tutorial(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    let score = users::complete_tutorial(&state.db, &current.user.id).await?;
    Ok(Json(json!({ "score": score })))
}

/// GET /api/AppUsers/:id/roles
pub async fn roles(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(rbac::load_roles(&state.db, &id).await?))
}

/// PUT /api/AppUsers/:id/role
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RoleRequest>,
) -> ApiResult<Json<Vec<Role>>> {
    let role = request
        .role
        .ok_or_else(|| Error::WrongInput("role".to_string()))?;
    rbac::set_role_atomic(&state.db, &state.config.rbac, &id, &role).await?;
    info!("{} assigned role {} to user {}", admin.username, role, id);
    Ok(Json(rbac::load_roles(&state.db, &id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/confirm", get(confirm))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/score", get(score))
        .route("/busy", get(busy))
        .route("/leaderboard", get(leaderboard))
        .route("/tutorial", post(tutorial))
        .route("/:id/roles", get(roles))
        .route("/:id/role", put(set_role))
}

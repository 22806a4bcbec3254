//! /api/Collections endpoints
//!
//! Listing shows public collections to everyone and every collection to
//! administrators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, put},
    Json, Router,
};
use transcriba_common::config::ADMIN_ROLE;
use transcriba_common::models::Collection;

use super::{image_response, AdminUser, ApiJson, ApiQuery, MaybeUser};
use crate::error::ApiResult;
use crate::pagination::PageQuery;
use crate::services::{catalog, rbac};
use crate::AppState;

/// GET /api/Collections
pub async fn list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> ApiResult<Json<Vec<catalog::CollectionProgress>>> {
    let include_private = match &user {
        Some(user) => rbac::has_role(&state.db, &user.id, ADMIN_ROLE).await?,
        None => false,
    };
    Ok(Json(catalog::list_collections(&state.db, include_private).await?))
}

/// POST /api/Collections
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<catalog::CollectionInput>,
) -> ApiResult<Json<Collection>> {
    Ok(Json(catalog::create_collection(&state.db, input).await?))
}

/// GET /api/Collections/:id/transcribaObjects?page
pub async fn objects(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<catalog::ObjectPage>> {
    let page = catalog::collection_objects(&state.db, &id, query.page()).await?;
    Ok(Json(page))
}

/// PUT /api/Collections/:id/transcribaObjects/rel/:fk
pub async fn add_object(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((id, fk)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    catalog::add_object(&state.db, &id, &fk).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/Collections/:id/thumbnail
pub async fn thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let path =
        catalog::collection_thumbnail(&state.db, &state.paths.imports, &state.paths.assets, &id)
            .await?;
    image_response(&path).await
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id/transcribaObjects", get(objects))
        .route("/:id/transcribaObjects/rel/:fk", put(add_object))
        .route("/:id/thumbnail", get(thumbnail))
}

//! /api/TranscribaObjects endpoints

use axum::{
    body::Body,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use transcriba_common::models::{ChronicItem, Revision, TranscribaObject};
use transcriba_common::Error;

use super::{image_response, AdminUser, ApiJson, ApiQuery, CurrentUser, MaybeUser};
use crate::error::ApiResult;
use crate::services::{images, import, objects, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TileQuery {
    pub zoom: Option<u32>,
    pub x: Option<u32>,
    pub y: Option<u32>,
}

/// Body of save and publish requests
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: Option<Value>,
}

impl ContentRequest {
    fn into_content(self) -> Result<Value, Error> {
        self.content.ok_or_else(|| Error::WrongInput("content".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct StageRequest {
    pub stage: Option<i64>,
}

/// POST /api/TranscribaObjects/import
pub async fn import_object(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(request): ApiJson<import::ImportRequest>,
) -> ApiResult<Json<String>> {
    let id = import::import_object(
        &state.db,
        &state.config,
        state.remote.as_ref(),
        &state.paths.imports,
        request,
    )
    .await?;
    Ok(Json(id))
}

/// GET /api/TranscribaObjects/occupied
pub async fn occupied(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<TranscribaObject>> {
    Ok(Json(objects::occupied(&state.db, &current.user.id).await?))
}

/// POST /api/TranscribaObjects/free
pub async fn free(State(state): State<AppState>, current: CurrentUser) -> Json<bool> {
    Json(objects::free(&state.db, &current.user.id).await)
}

/// GET /api/TranscribaObjects/:id
pub async fn find(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TranscribaObject>> {
    Ok(Json(objects::find(&state.db, &id).await?))
}

/// GET /api/TranscribaObjects/:id/tiles?zoom&x&y
///
/// Tiles missing from the pyramid are answered with a blank PNG.
pub async fn tile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<TileQuery>,
) -> ApiResult<Response> {
    let (Some(zoom), Some(x), Some(y)) = (query.zoom, query.x, query.y) else {
        return Err(Error::WrongInput("zoom, x and y".to_string()).into());
    };
    let object = objects::find(&state.db, &id).await?;
    match images::tile(&state.paths.imports, &object.id, zoom, x, y) {
        Ok(path) => image_response(&path).await,
        Err(Error::NotFound(_)) => {
            let blank = images::blank_tile(state.config.viewer.tile_size)?;
            Ok(([(CONTENT_TYPE, "image/png")], Body::from(blank)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /api/TranscribaObjects/:id/thumbnail
pub async fn thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let object = objects::find(&state.db, &id).await?;
    let path = images::thumbnail(&state.paths.imports, &object.id)?;
    image_response(&path).await
}

/// GET /api/TranscribaObjects/:id/overview
pub async fn overview(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let object = objects::find(&state.db, &id).await?;
    let path = images::overview(&state.paths.imports, &object.id)?;
    image_response(&path).await
}

/// GET /api/TranscribaObjects/:id/dimensions
pub async fn dimensions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<[i64; 2]>> {
    let object = objects::find(&state.db, &id).await?;
    Ok(Json(images::dimensions(&object)?))
}

/// GET /api/TranscribaObjects/:id/zoomsteps
pub async fn zoomsteps(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<u32>> {
    let object = objects::find(&state.db, &id).await?;
    let [width, height] = images::dimensions(&object)?;
    Ok(Json(images::zoomsteps(width, height, state.config.viewer.tile_size)))
}

/// GET /api/TranscribaObjects/:id/chronic
pub async fn chronic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ChronicItem>>> {
    Ok(Json(objects::chronic(&state.db, &id).await?))
}

/// GET /api/TranscribaObjects/:id/latest
pub async fn latest(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Revision>> {
    Ok(Json(objects::latest(&state.db, &id).await?))
}

/// GET /api/TranscribaObjects/:id/stable
pub async fn stable(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Revision>> {
    Ok(Json(objects::stable(&state.db, &id).await?))
}

/// GET /api/TranscribaObjects/:id/latestPermissions
pub async fn latest_permissions(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Json<users::VotePermission>> {
    let permission =
        users::latest_permissions(&state.db, &state.config, user.as_ref(), &id).await?;
    Ok(Json(permission))
}

/// POST /api/TranscribaObjects/:id/occupy
pub async fn occupy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Revision>> {
    Ok(Json(objects::occupy(&state.db, &current.user.id, &id).await?))
}

/// POST /api/TranscribaObjects/:id/save
pub async fn save(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> ApiResult<Json<Revision>> {
    let content = request.into_content()?;
    let revision = objects::save_content(&state.db, &current.user.id, &id, content).await?;
    Ok(Json(revision))
}

/// POST /api/TranscribaObjects/:id/publish
pub async fn publish(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> ApiResult<Json<bool>> {
    let content = request.into_content()?;
    Ok(Json(objects::publish(&state.db, &current.user.id, &id, content).await))
}

/// POST /api/TranscribaObjects/:id/publishTags
pub async fn publish_tags(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(objects::publish_generated_tags(&state.db, &id).await?))
}

/// PUT /api/TranscribaObjects/:id/stage
pub async fn set_stage(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StageRequest>,
) -> ApiResult<Json<TranscribaObject>> {
    let stage = request
        .stage
        .ok_or_else(|| Error::WrongInput("stage".to_string()))?;
    objects::set_stage(&state.db, &id, stage).await?;
    Ok(Json(objects::find(&state.db, &id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(import_object))
        .route("/occupied", get(occupied))
        .route("/free", post(free))
        .route("/:id", get(find))
        .route("/:id/tiles", get(tile))
        .route("/:id/thumbnail", get(thumbnail))
        .route("/:id/overview", get(overview))
        .route("/:id/dimensions", get(dimensions))
        .route("/:id/zoomsteps", get(zoomsteps))
        .route("/:id/chronic", get(chronic))
        .route("/:id/latest", get(latest))
        .route("/:id/stable", get(stable))
        .route("/:id/latestPermissions", get(latest_permissions))
        .route("/:id/occupy", post(occupy))
        .route("/:id/save", post(save))
        .route("/:id/publish", post(publish))
        .route("/:id/publishTags", post(publish_tags))
        .route("/:id/stage", put(set_stage))
}

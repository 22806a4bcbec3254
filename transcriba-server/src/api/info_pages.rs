//! /api/InfoPages endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use transcriba_common::models::InfoPage;

use super::{AdminUser, ApiJson};
use crate::error::ApiResult;
use crate::services::pages;
use crate::AppState;

/// GET /api/InfoPages
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<InfoPage>>> {
    Ok(Json(pages::list_info_pages(&state.db).await?))
}

/// POST /api/InfoPages
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<pages::InfoPageInput>,
) -> ApiResult<Json<InfoPage>> {
    Ok(Json(pages::create_info_page(&state.db, input).await?))
}

/// GET /api/InfoPages/:name/parsed
pub async fn parsed(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<InfoPage>> {
    Ok(Json(pages::parsed_info_page(&state.db, &name).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:name/parsed", get(parsed))
}

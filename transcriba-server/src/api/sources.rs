//! /api/Sources endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use transcriba_common::models::{Source, SourceSummary};

use super::{AdminUser, ApiJson};
use crate::error::ApiResult;
use crate::services::catalog;
use crate::AppState;

/// GET /api/Sources
pub async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Source>>> {
    Ok(Json(catalog::list_sources(&state.db).await?))
}

/// POST /api/Sources
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<catalog::SourceInput>,
) -> ApiResult<Json<Source>> {
    Ok(Json(catalog::create_source(&state.db, input).await?))
}

/// GET /api/Sources/:id/summary
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SourceSummary>> {
    Ok(Json(catalog::source_summary(&state.db, &id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id/summary", get(summary))
}

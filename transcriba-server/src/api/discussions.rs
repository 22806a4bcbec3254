//! /api/Discussions endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use transcriba_common::models::Comment;

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::error::ApiResult;
use crate::pagination::PageQuery;
use crate::services::pages;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

/// GET /api/Discussions/:id/comments?page
pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<pages::CommentPage>> {
    Ok(Json(pages::comments(&state.db, &id, query.page()).await?))
}

/// POST /api/Discussions/:id/comments
pub async fn post_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = pages::post_comment(&state.db, &current.user.id, &id, request.content).await?;
    Ok(Json(comment))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/:id/comments", get(comments).post(post_comment))
}

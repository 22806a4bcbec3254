//! HTTP API handlers for transcriba-server
//!
//! Paths follow the `/api/<Model>` layout existing web clients use.

pub mod auth;
pub mod collections;
pub mod discussions;
pub mod extract;
pub mod health;
pub mod info_pages;
pub mod objects;
pub mod sources;
pub mod users;
pub mod votings;

pub use auth::{AdminUser, CurrentUser, MaybeUser};
pub use extract::{ApiJson, ApiQuery};
pub use health::health_routes;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use std::path::Path;

use crate::error::ApiResult;
use crate::services::images;

/// Serve an image file with a content type derived from its extension
pub(crate) async fn image_response(path: &Path) -> ApiResult<Response> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(transcriba_common::Error::from)?;
    Ok(([(CONTENT_TYPE, images::content_type(path))], Body::from(bytes)).into_response())
}

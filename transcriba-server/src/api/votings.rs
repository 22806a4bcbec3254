//! /api/Votings endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use transcriba_common::models::Voting;
use transcriba_common::Error;

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::error::ApiResult;
use crate::services::voting;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeQuery {
    pub object_type: Option<String>,
    pub object_id: Option<String>,
}

/// POST /api/Votings/vote
pub async fn vote(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<voting::VoteRequest>,
) -> ApiResult<Json<Voting>> {
    let voting = voting::vote(&state.db, &state.config, &current.user, request).await?;
    Ok(Json(voting))
}

/// GET /api/Votings/outcome?objectType&objectId
pub async fn outcome(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OutcomeQuery>,
) -> ApiResult<Json<Map<String, Value>>> {
    let (Some(object_type), Some(object_id)) = (query.object_type, query.object_id) else {
        return Err(Error::WrongInput("objectType and objectId".to_string()).into());
    };
    Ok(Json(voting::outcome(&state.db, &object_type, &object_id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vote", post(vote))
        .route("/outcome", get(outcome))
}

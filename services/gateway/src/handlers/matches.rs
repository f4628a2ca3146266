use crate::error::AppError;
use crate::extract::ApiJson;
use crate::models::{EndMatchRequest, EndMatchResponse, MatchView};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use types::ids::{MatchId, UserId};
use types::time::now_nanos;

pub async fn end_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    ApiJson(payload): ApiJson<EndMatchRequest>,
) -> Result<Json<EndMatchResponse>, AppError> {
    let match_id = MatchId::parse(&match_id)?;
    let ended_by = UserId::parse(&payload.ended_by)?;

    let ended = state.engine.end_match(match_id, ended_by, now_nanos())?;

    Ok(Json(EndMatchResponse {
        match_id,
        ended_at: ended.record.ended_at,
        changed: ended.changed,
    }))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    let match_id = MatchId::parse(&match_id)?;
    let record = state.engine.get_match(match_id)?;
    Ok(Json(MatchView::from(&record)))
}

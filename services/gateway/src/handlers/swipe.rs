use crate::error::AppError;
use crate::models::{SwipeRequest, SwipeResponse};
use crate::state::AppState;
use crate::extract::ApiJson;
use axum::{extract::State, Json};
use types::ids::UserId;
use types::time::now_nanos;

pub async fn create_swipe(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SwipeRequest>,
) -> Result<Json<SwipeResponse>, AppError> {
    let actor = UserId::parse(&payload.actor_id)?;
    let target = UserId::parse(&payload.target_id)?;

    state.rate_limiter.check(actor)?;

    let outcome = state
        .engine
        .swipe_str(actor, target, &payload.action, now_nanos())?;

    // The target must not come back on the actor's next page
    state.cache.remove_from_feed(actor, target);

    tracing::info!(
        actor = %actor,
        target = %target,
        action = %outcome.swipe.action,
        matched = outcome.matched,
        "Swipe recorded"
    );

    Ok(Json(SwipeResponse {
        matched: outcome.matched,
        match_id: outcome.match_id,
    }))
}

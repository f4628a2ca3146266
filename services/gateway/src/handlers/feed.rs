use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::models::{FeedQuery, FeedResponse};
use crate::state::AppState;
use axum::{extract::State, Json};
use types::ids::UserId;
use types::time::now_nanos;

pub async fn get_feed(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let user = UserId::parse(&query.user_id)?;

    let page = state
        .cache
        .get_feed(user, query.limit, query.offset, now_nanos())
        .await?;

    Ok(Json(FeedResponse::from(&page)))
}

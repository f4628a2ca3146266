use crate::error::AppError;
use crate::extract::ApiJson;
use crate::models::EventAck;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use feed_engine::Ack;
use types::events::InboundEvent;

/// Inbound domain events from other services
///
/// 202 means the event may be acknowledged upstream; any error status
/// means it must be redelivered.
pub async fn ingest_event(
    State(state): State<AppState>,
    ApiJson(event): ApiJson<InboundEvent>,
) -> Result<(StatusCode, Json<EventAck>), AppError> {
    let event_id = event.event_id;
    let ack = state.listener.handle(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAck {
            event_id,
            duplicate: ack == Ack::Duplicate,
        }),
    ))
}

use crate::handlers::{events, feed, health, matches, swipe};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/swipes", post(swipe::create_swipe))
        .route("/feed", get(feed::get_feed))
        .route("/matches/{id}", get(matches::get_match))
        .route("/matches/{id}/end", post(matches::end_match))
        .route("/events", post(events::ingest_event));

    Router::new()
        .nest("/v1", api_routes)
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

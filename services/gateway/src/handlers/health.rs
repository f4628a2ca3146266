use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cache = state.cache.stats();
    let listener = state.listener.stats();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "typesVersion": types::LIB_VERSION,
        "feedCache": {
            "hits": cache.hits,
            "misses": cache.misses,
            "staleServed": cache.stale_served,
            "slots": cache.slots,
        },
        "rateLimiter": {
            "trackedActors": state.rate_limiter.tracked(),
        },
        "events": {
            "applied": listener.applied,
            "duplicates": listener.duplicates,
            "failed": listener.failed,
        }
    }))
}

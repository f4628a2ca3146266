use std::sync::Arc;
use std::time::Duration;

use feed_engine::FeedCache;
use tokio::task::JoinHandle;
use tracing::debug;
use types::time::now_nanos;

use crate::rate_limit::SwipeRateLimiter;

/// Periodically sweep abandoned feed snapshots and idle rate-limit
/// allowances
pub fn spawn_maintenance(
    cache: Arc<FeedCache>,
    rate_limiter: Arc<SwipeRateLimiter>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let feeds = cache.sweep(now_nanos());
            let allowances = rate_limiter.evict_idle();
            debug!(feeds, allowances, "Maintenance sweep");
        }
    })
}

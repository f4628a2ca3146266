use crate::config::GatewayConfig;
use crate::directory::HttpDirectory;
use crate::maintenance::spawn_maintenance;
use crate::rate_limit::SwipeRateLimiter;
use crate::sink::{spawn_listener_forwarder, BroadcastSink};
use feed_engine::{CandidateStore, ConsistencyListener, FeedCache, InMemoryDirectory};
use match_engine::store::{InMemoryMatchStore, InMemorySwipeStore};
use match_engine::MatchEngine;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 4096;

#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
    pub cache: Arc<FeedCache>,
    pub listener: Arc<ConsistencyListener>,
    pub rate_limiter: Arc<SwipeRateLimiter>,
}

impl AppState {
    /// Wire up the engine against the configured user directory
    pub fn new(config: &GatewayConfig) -> Self {
        let store: Arc<dyn CandidateStore> = match &config.directory_url {
            Some(url) => {
                info!(directory_url = %url, "Using HTTP user directory");
                Arc::new(HttpDirectory::new(Client::new(), url.clone()))
            }
            None => {
                warn!("MATCHFEED_DIRECTORY_URL not set, using empty in-memory directory");
                Arc::new(InMemoryDirectory::new())
            }
        };
        Self::with_store(config, store)
    }

    /// Must be called inside a tokio runtime; spawns the listener forwarder
    /// and the maintenance sweep.
    pub fn with_store(config: &GatewayConfig, store: Arc<dyn CandidateStore>) -> Self {
        let sink = Arc::new(BroadcastSink::new(EVENT_CHANNEL_CAPACITY));
        let events = sink.subscribe();

        let engine = MatchEngine::new(
            Arc::new(InMemorySwipeStore::new()),
            Arc::new(InMemoryMatchStore::new()),
            sink,
        );
        let cache = Arc::new(FeedCache::with_config(
            config.cache_config(),
            config.scoring_config(),
            store,
            engine.clone(),
        ));
        let listener = Arc::new(ConsistencyListener::new(
            config.listener_config(),
            cache.clone(),
            engine.clone(),
        ));
        spawn_listener_forwarder(events, listener.clone());

        let rate_limiter = Arc::new(SwipeRateLimiter::new(config.swipe_rate_per_sec));
        spawn_maintenance(cache.clone(), rate_limiter.clone(), config.sweep_interval());

        Self {
            engine,
            cache,
            listener,
            rate_limiter,
        }
    }
}

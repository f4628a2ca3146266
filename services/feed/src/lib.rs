//! Feed Engine Service
//!
//! Ranked candidate feeds built on top of the match engine's swipe and
//! match state.
//!
//! **Components:**
//! - `candidates`: read-only candidate store boundary and in-memory directory
//! - `scorer`: deterministic 0–100 scoring and feed ordering
//! - `cache`: per-user snapshots with generation-checked write-back
//! - `listener`: applies inbound domain events to the cache
//!
//! **Key Invariants:**
//! - Candidates the viewer swiped on, or is matched with, never appear
//! - A page sequence is stable while its snapshot is within TTL
//! - An invalidated feed is never resurrected by an in-flight recompute
//! - Upstream failure serves a stale snapshot or errors; never an empty feed

pub mod config;
pub mod candidates;
pub mod scorer;
pub mod cache;
pub mod listener;

pub use cache::{CacheStats, FeedCache};
pub use candidates::{CandidateStore, CandidateStoreError, InMemoryDirectory, PoolFilters};
pub use config::{DeletedUserPolicy, FeedCacheConfig, ListenerConfig, ScoringConfig};
pub use listener::{Ack, ConsistencyListener, ListenerStats};

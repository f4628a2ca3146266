//! Consistency listener
//!
//! Applies inbound domain events to the feed cache. Delivery is
//! at-least-once and unordered, so every handler is idempotent on its own:
//! invalidating twice or removing an absent candidate is a no-op. The
//! dedup window only short-circuits recent redeliveries.
//!
//! Events touching the same user are serialized through a per-user lock;
//! events for different users run concurrently. Multi-user events take
//! their locks in ascending id order.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use match_engine::MatchEngine;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info};
use types::errors::EventProcessingError;
use types::events::{InboundEvent, InboundPayload};
use types::ids::{EventId, UserId};

use crate::cache::FeedCache;
use crate::config::{DeletedUserPolicy, ListenerConfig};

/// Listener verdict for one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Effects applied (possibly as no-ops)
    Applied,
    /// Seen recently; nothing done
    Duplicate,
}

/// Bounded memory of applied event ids
struct DedupWindow {
    capacity: usize,
    order: VecDeque<EventId>,
    seen: HashSet<EventId>,
}

impl DedupWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    fn contains(&self, id: &EventId) -> bool {
        self.seen.contains(id)
    }

    fn record(&mut self, id: EventId) {
        if self.capacity == 0 || !self.seen.insert(id) {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub applied: u64,
    pub duplicates: u64,
    pub failed: u64,
}

pub struct ConsistencyListener {
    config: ListenerConfig,
    cache: Arc<FeedCache>,
    engine: MatchEngine,
    user_locks: DashMap<UserId, Arc<AsyncMutex<()>>>,
    dedup: Mutex<DedupWindow>,
    applied: AtomicU64,
    duplicates: AtomicU64,
    failed: AtomicU64,
}

impl ConsistencyListener {
    pub fn new(config: ListenerConfig, cache: Arc<FeedCache>, engine: MatchEngine) -> Self {
        info!(
            dedup_window = config.dedup_window,
            deleted_user_policy = ?config.deleted_user_policy,
            "ConsistencyListener initialized"
        );
        Self {
            dedup: Mutex::new(DedupWindow::new(config.dedup_window)),
            config,
            cache,
            engine,
            user_locks: DashMap::new(),
            applied: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Apply one delivery
    ///
    /// `Ok` means the event may be acknowledged. On `Err` nothing is
    /// remembered, so a redelivery retries the whole event.
    pub async fn handle(&self, event: InboundEvent) -> Result<Ack, EventProcessingError> {
        if self.is_duplicate(&event.event_id) {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(
                event_id = %event.event_id,
                event_type = event.event_type_label(),
                "Dropping duplicate event"
            );
            return Ok(Ack::Duplicate);
        }

        let users = event.affected_users();
        let guards = self.lock_users(&users).await;

        match self.apply(&event) {
            Ok(()) => {
                self.remember(event.event_id);
                self.applied.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_id = %event.event_id,
                    event_type = event.event_type_label(),
                    "Event applied"
                );
                drop(guards);
                self.release_locks(&users);
                Ok(Ack::Applied)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    event_id = %event.event_id,
                    event_type = event.event_type_label(),
                    error = %e,
                    "Event processing failed, leaving unacknowledged"
                );
                drop(guards);
                self.release_locks(&users);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> ListenerStats {
        ListenerStats {
            applied: self.applied.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn apply(&self, event: &InboundEvent) -> Result<(), EventProcessingError> {
        match &event.payload {
            InboundPayload::UserUpdated { user_id } => {
                self.cache.invalidate_feed(*user_id);
            }
            InboundPayload::UserDeleted { user_id } => {
                self.cache.invalidate_feed(*user_id);
                let ended = self.engine.end_matches_for_user(*user_id, event.occurred_at)?;
                if self.config.deleted_user_policy == DeletedUserPolicy::EagerScrub {
                    self.cache.eager_scrub(*user_id);
                }
                info!(user = %user_id, matches_ended = ended.len(), "Deleted user processed");
            }
            InboundPayload::MatchCreated {
                user_low, user_high, ..
            } => {
                self.cache.remove_from_feed(*user_low, *user_high);
                self.cache.remove_from_feed(*user_high, *user_low);
            }
            // An ended match does not put the partner back into either feed
            InboundPayload::MatchEnded { .. } => {}
        }
        Ok(())
    }

    fn is_duplicate(&self, id: &EventId) -> bool {
        self.dedup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(id)
    }

    fn remember(&self, id: EventId) {
        self.dedup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(id);
    }

    async fn lock_users(&self, users: &[UserId]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = users.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for user in ordered {
            let lock = self
                .user_locks
                .entry(user)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone();
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    /// Drop lock entries nobody else holds or waits on
    fn release_locks(&self, users: &[UserId]) {
        for user in users {
            self.user_locks
                .remove_if(user, |_, lock| Arc::strong_count(lock) == 1);
        }
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.user_locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::candidates::InMemoryDirectory;
    use match_engine::events::RecordingSink;
    use match_engine::store::{InMemoryMatchStore, InMemorySwipeStore};

    fn listener(policy: DeletedUserPolicy, window: usize) -> ConsistencyListener {
        let engine = MatchEngine::new(
            Arc::new(InMemorySwipeStore::new()),
            Arc::new(InMemoryMatchStore::new()),
            Arc::new(RecordingSink::new()),
        );
        let cache = Arc::new(FeedCache::new(
            Arc::new(InMemoryDirectory::new()),
            engine.clone(),
        ));
        ConsistencyListener::new(
            ListenerConfig {
                dedup_window: window,
                deleted_user_policy: policy,
            },
            cache,
            engine,
        )
    }

    #[test]
    fn test_dedup_window_evicts_oldest() {
        let mut window = DedupWindow::new(2);
        let ids: Vec<EventId> = (0..3).map(|_| EventId::new()).collect();
        for id in &ids {
            window.record(*id);
        }
        assert!(!window.contains(&ids[0]));
        assert!(window.contains(&ids[1]));
        assert!(window.contains(&ids[2]));
    }

    #[tokio::test]
    async fn test_redelivery_is_duplicate() {
        let listener = listener(DeletedUserPolicy::TtlExpiry, 16);
        let event = InboundEvent::new(
            InboundPayload::UserUpdated {
                user_id: UserId::new(),
            },
            1,
        );

        assert_eq!(listener.handle(event.clone()).await.unwrap(), Ack::Applied);
        assert_eq!(listener.handle(event).await.unwrap(), Ack::Duplicate);
        assert_eq!(
            listener.stats(),
            ListenerStats {
                applied: 1,
                duplicates: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_without_window_redelivery_reapplies_harmlessly() {
        let listener = listener(DeletedUserPolicy::TtlExpiry, 0);
        let event = InboundEvent::new(
            InboundPayload::MatchEnded {
                match_id: types::ids::MatchId::new(),
            },
            1,
        );
        assert_eq!(listener.handle(event.clone()).await.unwrap(), Ack::Applied);
        assert_eq!(listener.handle(event).await.unwrap(), Ack::Applied);
    }

    #[tokio::test]
    async fn test_lock_entries_released() {
        let listener = listener(DeletedUserPolicy::EagerScrub, 16);
        let event = InboundEvent::new(
            InboundPayload::MatchCreated {
                match_id: types::ids::MatchId::new(),
                user_low: UserId::new(),
                user_high: UserId::new(),
            },
            1,
        );
        listener.handle(event).await.unwrap();
        assert_eq!(listener.lock_entries(), 0);
    }
}

//! Feed cache
//!
//! One ranked snapshot per user, served by slicing on hit and rebuilt on
//! miss or expiry from the candidate store.
//!
//! Consistency rules:
//! - Each user slot carries a generation drawn from a cache-wide counter.
//!   `remove_from_feed` and `eager_scrub` move it forward and
//!   `invalidate_feed` drops the slot. A recompute records the generation
//!   it started from and only writes back into that same slot generation.
//!   An in-flight stale recompute can never resurrect an invalidated feed,
//!   even if a new slot was created for the user meanwhile.
//! - `remove_from_feed` tombstones the candidate (O(1)) instead of
//!   re-scoring. Tombstones stay in place until the next recompute so page
//!   offsets keep pointing at the same snapshot positions.
//! - Page offsets index snapshot positions, not live entries. A page is the
//!   live candidates in `[offset, offset + limit)`; it may come back short
//!   when candidates in that window were removed. Reading page `n`,
//!   swiping all of it, then reading page `n + 1` serves every candidate
//!   exactly once.
//! - Expired snapshots are kept as the serve-stale fallback for when the
//!   candidate store fails, but only for `max_stale` past expiry. `sweep`
//!   drops anything older.
//! - A slot with no snapshot only survives while a recompute is running;
//!   a failed or discarded recompute releases it.
//! - Failure with nothing to fall back on is `FeedError::Unavailable`,
//!   never an empty page.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use match_engine::MatchEngine;
use tracing::{debug, info, warn};
use types::errors::{FeedError, ValidationError};
use types::feed::{FeedPage, ScoredCandidate};
use types::ids::UserId;
use types::profile::UserProfile;
use types::time::duration_nanos;

use crate::candidates::{CandidateStore, CandidateStoreError, PoolFilters};
use crate::config::{FeedCacheConfig, ScoringConfig};
use crate::scorer;

// ── Snapshot ────────────────────────────────────────────────────────

/// Ranked candidates for one user at one point in time
#[derive(Debug, Clone)]
struct FeedSnapshot {
    ordered: Vec<ScoredCandidate>,
    members: HashSet<UserId>,
    removed: HashSet<UserId>,
    computed_at: i64,
    expires_at: i64,
}

impl FeedSnapshot {
    /// Repeated candidates keep their first (highest ranked) position.
    fn new(mut ordered: Vec<ScoredCandidate>, computed_at: i64, ttl_nanos: i64) -> Self {
        let mut members = HashSet::with_capacity(ordered.len());
        ordered.retain(|c| members.insert(c.candidate_id));
        Self {
            ordered,
            members,
            removed: HashSet::new(),
            computed_at,
            expires_at: computed_at.saturating_add(ttl_nanos),
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Past expiry by more than `max_stale_nanos`; no longer a fallback
    fn is_abandoned(&self, now: i64, max_stale_nanos: i64) -> bool {
        now >= self.expires_at.saturating_add(max_stale_nanos)
    }

    fn is_live(&self, candidate: &ScoredCandidate) -> bool {
        !self.removed.contains(&candidate.candidate_id)
    }

    fn live_len(&self) -> usize {
        self.members.len() - self.removed.len()
    }

    fn contains(&self, candidate: UserId) -> bool {
        self.members.contains(&candidate) && !self.removed.contains(&candidate)
    }

    /// Tombstone a candidate. Returns false if absent or already removed.
    fn remove(&mut self, candidate: UserId) -> bool {
        self.members.contains(&candidate) && self.removed.insert(candidate)
    }

    fn page(&self, limit: usize, offset: usize, stale: bool) -> FeedPage {
        let start = offset.min(self.ordered.len());
        let end = offset.saturating_add(limit).min(self.ordered.len());

        let candidates: Vec<ScoredCandidate> = self.ordered[start..end]
            .iter()
            .filter(|c| self.is_live(c))
            .cloned()
            .collect();

        FeedPage {
            candidates,
            has_more: self.ordered[end..].iter().any(|c| self.is_live(c)),
            next_offset: end,
            total: self.live_len(),
            stale,
            computed_at: self.computed_at,
        }
    }
}

#[derive(Debug)]
struct FeedSlot {
    generation: u64,
    snapshot: Option<FeedSnapshot>,
}

// ── Stats ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
    discarded_recomputes: AtomicU64,
    invalidations: AtomicU64,
    removals: AtomicU64,
    swept: AtomicU64,
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale_served: u64,
    pub discarded_recomputes: u64,
    pub invalidations: u64,
    pub removals: u64,
    /// Slots dropped by `sweep`
    pub swept: u64,
    /// Slots currently held
    pub slots: usize,
}

// ── Cache ───────────────────────────────────────────────────────────

/// Per-user feed cache
pub struct FeedCache {
    config: FeedCacheConfig,
    scoring: ScoringConfig,
    slots: DashMap<UserId, FeedSlot>,
    generations: AtomicU64,
    store: Arc<dyn CandidateStore>,
    engine: MatchEngine,
    counters: Counters,
}

impl FeedCache {
    pub fn new(store: Arc<dyn CandidateStore>, engine: MatchEngine) -> Self {
        Self::with_config(
            FeedCacheConfig::default(),
            ScoringConfig::default(),
            store,
            engine,
        )
    }

    pub fn with_config(
        config: FeedCacheConfig,
        scoring: ScoringConfig,
        store: Arc<dyn CandidateStore>,
        engine: MatchEngine,
    ) -> Self {
        info!(
            ttl_secs = config.ttl.as_secs(),
            max_stale_secs = config.max_stale.as_secs(),
            max_pool = config.max_pool_size,
            upstream_timeout_ms = config.upstream_timeout.as_millis() as u64,
            "FeedCache initialized"
        );
        Self {
            config,
            scoring,
            slots: DashMap::new(),
            generations: AtomicU64::new(0),
            store,
            engine,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &FeedCacheConfig {
        &self.config
    }

    /// Read one page of `user`'s feed
    ///
    /// `limit == 0` selects the default page size. `offset` is a position in
    /// the snapshot; continue with the returned `next_offset`.
    pub async fn get_feed(
        &self,
        user: UserId,
        limit: usize,
        offset: usize,
        now: i64,
    ) -> Result<FeedPage, FeedError> {
        let limit = self.effective_limit(limit)?;

        if let Some(slot) = self.slots.get(&user) {
            if let Some(snapshot) = slot.snapshot.as_ref().filter(|s| !s.is_expired(now)) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(snapshot.page(limit, offset, false));
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let (snapshot, stale) = self.refresh(user, now).await?;
        Ok(snapshot.page(limit, offset, stale))
    }

    /// Compute and store `user`'s feed ahead of the first read
    ///
    /// Returns the number of ranked candidates.
    pub async fn warm_feed(&self, user: UserId, now: i64) -> Result<usize, FeedError> {
        let (snapshot, _) = self.refresh(user, now).await?;
        Ok(snapshot.live_len())
    }

    /// Drop `user`'s snapshot; the next read recomputes. No-op when absent.
    pub fn invalidate_feed(&self, user: UserId) {
        if let Some((_, slot)) = self.slots.remove(&user) {
            if slot.snapshot.is_some() {
                self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
                debug!(user = %user, "Feed invalidated");
            }
        }
    }

    /// Remove one candidate from `user`'s cached feed without re-scoring
    ///
    /// Returns true if the candidate was present. No-op when absent.
    pub fn remove_from_feed(&self, user: UserId, candidate: UserId) -> bool {
        let mut slot = match self.slots.get_mut(&user) {
            Some(slot) => slot,
            None => return false,
        };
        slot.generation = self.next_generation();

        let removed = slot
            .snapshot
            .as_mut()
            .map(|s| s.remove(candidate))
            .unwrap_or(false);
        if removed {
            self.counters.removals.fetch_add(1, Ordering::Relaxed);
            debug!(user = %user, candidate = %candidate, "Candidate removed from feed");
        }
        removed
    }

    /// Remove `candidate` from every cached feed
    ///
    /// Returns the number of feeds that contained it.
    pub fn eager_scrub(&self, candidate: UserId) -> usize {
        let mut scrubbed = 0;
        for mut slot in self.slots.iter_mut() {
            slot.generation = self.next_generation();
            if let Some(snapshot) = slot.snapshot.as_mut() {
                if snapshot.remove(candidate) {
                    scrubbed += 1;
                }
            }
        }
        self.counters
            .removals
            .fetch_add(scrubbed as u64, Ordering::Relaxed);
        info!(candidate = %candidate, feeds = scrubbed, "Candidate scrubbed from cached feeds");
        scrubbed
    }

    /// Drop snapshots expired for longer than `max_stale`, and slots left
    /// without a snapshot
    ///
    /// A recompute whose slot is swept mid-flight is discarded; the next
    /// read recomputes. Returns the number of slots dropped.
    pub fn sweep(&self, now: i64) -> usize {
        let max_stale = duration_nanos(self.config.max_stale);
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            slot.snapshot
                .as_ref()
                .is_some_and(|s| !s.is_abandoned(now, max_stale))
        });
        let swept = before.saturating_sub(self.slots.len());
        if swept > 0 {
            self.counters
                .swept
                .fetch_add(swept as u64, Ordering::Relaxed);
            debug!(swept, remaining = self.slots.len(), "Feed cache swept");
        }
        swept
    }

    /// Whether `user` has a snapshot that is still within its TTL
    pub fn is_cached(&self, user: UserId, now: i64) -> bool {
        self.slots
            .get(&user)
            .and_then(|slot| slot.snapshot.as_ref().map(|s| !s.is_expired(now)))
            .unwrap_or(false)
    }

    /// Whether `user`'s snapshot (fresh or stale) lists `candidate`
    pub fn snapshot_contains(&self, user: UserId, candidate: UserId) -> bool {
        self.slots
            .get(&user)
            .and_then(|slot| slot.snapshot.as_ref().map(|s| s.contains(candidate)))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale_served: self.counters.stale_served.load(Ordering::Relaxed),
            discarded_recomputes: self.counters.discarded_recomputes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            removals: self.counters.removals.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
            slots: self.slots.len(),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn effective_limit(&self, limit: usize) -> Result<usize, ValidationError> {
        if limit == 0 {
            return Ok(self.config.default_page_size);
        }
        if limit > self.config.max_page_size {
            return Err(ValidationError::InvalidPage {
                limit,
                max: self.config.max_page_size,
            });
        }
        Ok(limit)
    }

    /// Recompute under the upstream timeout and write back if still fresh.
    /// Falls back to the retained snapshot when the store fails.
    /// The flag is true when the returned snapshot is the stale fallback.
    async fn refresh(&self, user: UserId, now: i64) -> Result<(FeedSnapshot, bool), FeedError> {
        let generation = self
            .slots
            .entry(user)
            .or_insert_with(|| FeedSlot {
                generation: self.next_generation(),
                snapshot: None,
            })
            .generation;
        let started = Instant::now();

        let computed = match tokio::time::timeout(self.config.upstream_timeout, self.compute(user))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FeedError::Unavailable {
                reason: format!(
                    "candidate store timed out after {} ms",
                    self.config.upstream_timeout.as_millis()
                ),
            }),
        };

        let ranked = match computed {
            Ok(ranked) => ranked,
            Err(FeedError::Unavailable { reason }) => {
                let fallback = self.stale_fallback(user, reason, now).map(|s| (s, true));
                self.release_empty_slot(user);
                return fallback;
            }
            Err(other) => {
                self.release_empty_slot(user);
                return Err(other);
            }
        };

        let snapshot = FeedSnapshot::new(ranked, now, duration_nanos(self.config.ttl));

        let written = match self.slots.get_mut(&user) {
            Some(mut slot) if slot.generation == generation => {
                slot.snapshot = Some(snapshot.clone());
                true
            }
            _ => false,
        };

        if written {
            info!(
                user = %user,
                candidates = snapshot.live_len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Feed recomputed"
            );
        } else {
            self.counters
                .discarded_recomputes
                .fetch_add(1, Ordering::Relaxed);
            self.release_empty_slot(user);
            debug!(user = %user, "Feed changed during recompute, result not cached");
        }
        Ok((snapshot, false))
    }

    /// Drop `user`'s slot if it holds no snapshot
    fn release_empty_slot(&self, user: UserId) {
        self.slots.remove_if(&user, |_, slot| slot.snapshot.is_none());
    }

    fn stale_fallback(
        &self,
        user: UserId,
        reason: String,
        now: i64,
    ) -> Result<FeedSnapshot, FeedError> {
        let max_stale = duration_nanos(self.config.max_stale);
        let stale = self.slots.get(&user).and_then(|slot| {
            slot.snapshot
                .as_ref()
                .filter(|s| !s.is_abandoned(now, max_stale))
                .cloned()
        });

        match stale {
            Some(snapshot) => {
                self.counters.stale_served.fetch_add(1, Ordering::Relaxed);
                warn!(user = %user, reason = %reason, "Serving stale feed");
                Ok(snapshot)
            }
            None => {
                warn!(user = %user, reason = %reason, "Feed unavailable, no snapshot to serve");
                Err(FeedError::Unavailable { reason })
            }
        }
    }

    /// Candidate store query → exclusions → scoring
    async fn compute(&self, user: UserId) -> Result<Vec<ScoredCandidate>, FeedError> {
        let profile = self
            .store
            .get_user_attributes(user)
            .await
            .map_err(|e| match e {
                CandidateStoreError::NotFound(id) => FeedError::UserNotFound {
                    user_id: id.to_string(),
                },
                CandidateStoreError::Unavailable(reason) => FeedError::Unavailable { reason },
            })?;

        let filters = PoolFilters::for_viewer(
            &profile.preferences,
            self.scoring.age_grace_years,
            self.config.max_pool_size,
        );
        let pool = self
            .store
            .get_candidate_pool(user, &filters)
            .await
            .map_err(|e| match e {
                CandidateStoreError::NotFound(id) => FeedError::UserNotFound {
                    user_id: id.to_string(),
                },
                CandidateStoreError::Unavailable(reason) => FeedError::Unavailable { reason },
            })?;

        let excluded = self
            .engine
            .excluded_candidates(user)
            .map_err(|e| FeedError::Unavailable {
                reason: e.to_string(),
            })?;

        // The store may repeat ids; score each candidate once
        let mut seen = HashSet::with_capacity(pool.len());
        let eligible: Vec<UserId> = pool
            .into_iter()
            .filter(|id| *id != user && !excluded.contains(id) && seen.insert(*id))
            .collect();

        let candidates = self.load_profiles(&eligible).await?;
        let ranked = scorer::rank(&profile, &candidates, &excluded, &self.scoring);

        debug!(
            user = %user,
            eligible = eligible.len(),
            ranked = ranked.len(),
            "Candidates scored"
        );
        Ok(ranked)
    }

    /// Fetch candidate attributes concurrently; vanished users are skipped
    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<UserProfile>, FeedError> {
        let results = join_all(ids.iter().map(|id| self.store.get_user_attributes(*id))).await;

        let mut profiles = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(profile) => profiles.push(profile),
                Err(CandidateStoreError::NotFound(id)) => {
                    debug!(candidate = %id, "Candidate no longer exists, excluded");
                }
                Err(CandidateStoreError::Unavailable(reason)) => {
                    return Err(FeedError::Unavailable { reason });
                }
            }
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: i64) -> ScoredCandidate {
        let d = rust_decimal::Decimal::from(score);
        ScoredCandidate {
            candidate_id: UserId::new(),
            score: d,
            components: types::feed::ScoreComponents {
                interest_score: d,
                age_score: rust_decimal::Decimal::ZERO,
                preference_score: rust_decimal::Decimal::ZERO,
            },
            last_active_at: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_snapshot_paging() {
        let snap = FeedSnapshot::new((0..5).map(|i| candidate(100 - i)).collect(), 0, 10);
        let first = snap.page(2, 0, false);
        assert_eq!(first.candidates.len(), 2);
        assert!(first.has_more);
        let last = snap.page(2, 4, false);
        assert_eq!(last.candidates.len(), 1);
        assert!(!last.has_more);
        let beyond = snap.page(2, 10, false);
        assert!(beyond.candidates.is_empty());
        assert!(!beyond.has_more);
        assert_eq!(beyond.next_offset, 5);
    }

    #[test]
    fn test_snapshot_tombstones_keep_positions() {
        let ordered: Vec<_> = (0..6).map(|i| candidate(100 - i)).collect();
        let ids: Vec<UserId> = ordered.iter().map(|c| c.candidate_id).collect();
        let mut snap = FeedSnapshot::new(ordered, 0, 10);

        assert!(snap.remove(ids[1]));
        assert!(!snap.remove(ids[1]), "second removal is a no-op");
        assert!(!snap.remove(UserId::new()), "absent candidate is a no-op");

        let page = snap.page(3, 0, false);
        let got: Vec<UserId> = page.candidates.iter().map(|c| c.candidate_id).collect();
        assert_eq!(got, vec![ids[0], ids[2]]);
        assert_eq!(page.next_offset, 3);
        assert_eq!(page.total, 5);
        assert!(page.has_more);

        let next = snap.page(3, page.next_offset, false);
        let got: Vec<UserId> = next.candidates.iter().map(|c| c.candidate_id).collect();
        assert_eq!(got, vec![ids[3], ids[4], ids[5]]);
        assert!(!next.has_more);
    }

    #[test]
    fn test_consumed_page_does_not_shift_next_page() {
        let ordered: Vec<_> = (0..6).map(|i| candidate(100 - i)).collect();
        let ids: Vec<UserId> = ordered.iter().map(|c| c.candidate_id).collect();
        let mut snap = FeedSnapshot::new(ordered, 0, 10);

        let mut served = Vec::new();
        let mut offset = 0;
        loop {
            let page = snap.page(2, offset, false);
            for c in &page.candidates {
                served.push(c.candidate_id);
                assert!(snap.remove(c.candidate_id));
            }
            offset = page.next_offset;
            if !page.has_more {
                break;
            }
        }
        assert_eq!(served, ids);
        assert_eq!(snap.live_len(), 0);
    }

    #[test]
    fn test_removed_tail_ends_paging() {
        let ordered: Vec<_> = (0..4).map(|i| candidate(100 - i)).collect();
        let ids: Vec<UserId> = ordered.iter().map(|c| c.candidate_id).collect();
        let mut snap = FeedSnapshot::new(ordered, 0, 10);

        snap.remove(ids[2]);
        snap.remove(ids[3]);
        let page = snap.page(2, 0, false);
        assert_eq!(page.candidates.len(), 2);
        assert!(!page.has_more, "only tombstones remain past the page");
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_snapshot_keeps_first_of_repeated_candidates() {
        let first = candidate(90);
        let mut repeat = first.clone();
        repeat.score = rust_decimal::Decimal::from(10);
        let other = candidate(50);
        let mut snap = FeedSnapshot::new(vec![first.clone(), other.clone(), repeat], 0, 10);

        assert_eq!(snap.ordered.len(), 2);
        assert_eq!(snap.live_len(), 2);
        assert!(snap.remove(first.candidate_id));
        let page = snap.page(10, 0, false);
        assert_eq!(page.candidates, vec![other]);
        assert_eq!(page.total, 1);
        assert!(!page.has_more);
    }

    #[test]
    fn test_snapshot_expiry() {
        let snap = FeedSnapshot::new(Vec::new(), 100, 50);
        assert!(!snap.is_expired(149));
        assert!(snap.is_expired(150));
        assert!(!snap.is_abandoned(150, 20));
        assert!(snap.is_abandoned(170, 20));
    }
}

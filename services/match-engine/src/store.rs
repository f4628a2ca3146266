//! Storage boundary for swipes and matches
//!
//! The match detector's only correctness guarantee is the atomic
//! conditional insert on the canonical pair (`MatchStore::insert_if_absent`).
//! Any backend must provide it: a unique constraint on
//! `(user_low_id, user_high_id)` over active matches, or a compare-and-swap
//! on the pair key. The in-memory backend uses `dashmap` entries, which
//! hold the shard lock for the duration of the check-and-insert.

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use types::errors::{MatchError, SwipeError};
use types::ids::{MatchId, SwipeId, UserId};
use types::matching::{CanonicalPair, Match};
use types::swipe::{Swipe, SwipeAction};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The pair already has an active match. Expected under races.
    #[error("Active match already exists for pair: {existing}")]
    PairConflict { existing: MatchId },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for SwipeError {
    fn from(err: StoreError) -> Self {
        SwipeError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(match_id) => MatchError::NotFound { match_id },
            other => MatchError::Storage {
                message: other.to_string(),
            },
        }
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Result of a swipe upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First swipe for this (actor, target)
    Inserted(Swipe),
    /// Existing swipe overwritten with a different action
    Changed { previous: SwipeAction, swipe: Swipe },
    /// Same action as stored; nothing written
    Unchanged(Swipe),
}

impl UpsertOutcome {
    pub fn swipe(&self) -> &Swipe {
        match self {
            UpsertOutcome::Inserted(s) | UpsertOutcome::Unchanged(s) => s,
            UpsertOutcome::Changed { swipe, .. } => swipe,
        }
    }

    pub fn is_new_or_changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged(_))
    }
}

/// Result of ending a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    /// This call performed the ACTIVE → ENDED transition
    Ended(Match),
    /// Already ended; record returned unchanged
    AlreadyEnded(Match),
}

// ── Traits ──────────────────────────────────────────────────────────

/// Durable swipe storage, one row per (actor, target)
pub trait SwipeStore: Send + Sync {
    /// Atomic per-pair upsert
    fn upsert(
        &self,
        actor: UserId,
        target: UserId,
        action: SwipeAction,
        at: i64,
    ) -> Result<UpsertOutcome, StoreError>;

    fn get(&self, actor: UserId, target: UserId) -> Result<Option<Swipe>, StoreError>;

    /// Swipes made by `actor`
    fn swipes_by(&self, actor: UserId) -> Result<Vec<Swipe>, StoreError>;

    /// Swipes received by `target`
    fn swipes_toward(&self, target: UserId) -> Result<Vec<Swipe>, StoreError>;
}

/// Durable match storage
pub trait MatchStore: Send + Sync {
    /// Insert `record` unless its pair already has an active match.
    ///
    /// Must be atomic with respect to concurrent inserts for the same pair;
    /// the loser gets `StoreError::PairConflict`.
    fn insert_if_absent(&self, record: Match) -> Result<Match, StoreError>;

    fn get(&self, id: MatchId) -> Result<Option<Match>, StoreError>;

    /// Atomic ACTIVE → ENDED transition; `NotFound` for unknown ids
    fn end(&self, id: MatchId, ended_by: UserId, at: i64) -> Result<EndOutcome, StoreError>;

    fn active_for_pair(&self, pair: CanonicalPair) -> Result<Option<Match>, StoreError>;

    /// Most recently created match for the pair, active or ended
    fn latest_for_pair(&self, pair: CanonicalPair) -> Result<Option<Match>, StoreError>;

    fn active_for_user(&self, user: UserId) -> Result<Vec<Match>, StoreError>;
}

// ── In-memory swipes ────────────────────────────────────────────────

/// In-memory swipe store
#[derive(Default)]
pub struct InMemorySwipeStore {
    swipes: DashMap<(UserId, UserId), Swipe>,
    by_actor: DashMap<UserId, HashSet<UserId>>,
    by_target: DashMap<UserId, HashSet<UserId>>,
}

impl InMemorySwipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.swipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swipes.is_empty()
    }
}

impl SwipeStore for InMemorySwipeStore {
    fn upsert(
        &self,
        actor: UserId,
        target: UserId,
        action: SwipeAction,
        at: i64,
    ) -> Result<UpsertOutcome, StoreError> {
        let outcome = match self.swipes.entry((actor, target)) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                if stored.action == action {
                    UpsertOutcome::Unchanged(stored.clone())
                } else {
                    let previous = stored.action;
                    stored.action = action;
                    stored.created_at = at;
                    UpsertOutcome::Changed {
                        previous,
                        swipe: stored.clone(),
                    }
                }
            }
            Entry::Vacant(entry) => {
                let swipe = Swipe {
                    id: SwipeId::new(),
                    actor_id: actor,
                    target_id: target,
                    action,
                    created_at: at,
                };
                entry.insert(swipe.clone());
                UpsertOutcome::Inserted(swipe)
            }
        };

        // Indexes are written after the row lock is released
        if matches!(outcome, UpsertOutcome::Inserted(_)) {
            self.by_actor.entry(actor).or_default().insert(target);
            self.by_target.entry(target).or_default().insert(actor);
        }

        Ok(outcome)
    }

    fn get(&self, actor: UserId, target: UserId) -> Result<Option<Swipe>, StoreError> {
        Ok(self.swipes.get(&(actor, target)).map(|s| s.clone()))
    }

    fn swipes_by(&self, actor: UserId) -> Result<Vec<Swipe>, StoreError> {
        let targets: Vec<UserId> = self
            .by_actor
            .get(&actor)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        Ok(targets
            .into_iter()
            .filter_map(|target| self.swipes.get(&(actor, target)).map(|s| s.clone()))
            .collect())
    }

    fn swipes_toward(&self, target: UserId) -> Result<Vec<Swipe>, StoreError> {
        let actors: Vec<UserId> = self
            .by_target
            .get(&target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        Ok(actors
            .into_iter()
            .filter_map(|actor| self.swipes.get(&(actor, target)).map(|s| s.clone()))
            .collect())
    }
}

// ── In-memory matches ───────────────────────────────────────────────

/// In-memory match store
///
/// `active_pairs` is the unique index over active matches. Lock order is
/// `active_pairs` → `matches`; `end` releases the `matches` guard before it
/// touches `active_pairs`.
#[derive(Default)]
pub struct InMemoryMatchStore {
    matches: DashMap<MatchId, Match>,
    active_pairs: DashMap<CanonicalPair, MatchId>,
    history: DashMap<CanonicalPair, Vec<MatchId>>,
    by_user: DashMap<UserId, HashSet<MatchId>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total match records, active and ended
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_pairs.len()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn insert_if_absent(&self, record: Match) -> Result<Match, StoreError> {
        let pair = record.pair();
        match self.active_pairs.entry(pair) {
            Entry::Occupied(entry) => {
                return Err(StoreError::PairConflict {
                    existing: *entry.get(),
                })
            }
            Entry::Vacant(entry) => {
                // Row is visible before the unique index entry is released
                self.matches.insert(record.id, record.clone());
                entry.insert(record.id);
            }
        }

        self.history.entry(pair).or_default().push(record.id);
        for user in [pair.low(), pair.high()] {
            self.by_user.entry(user).or_default().insert(record.id);
        }
        Ok(record)
    }

    fn get(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        Ok(self.matches.get(&id).map(|m| m.clone()))
    }

    fn end(&self, id: MatchId, ended_by: UserId, at: i64) -> Result<EndOutcome, StoreError> {
        let outcome = {
            let mut record = self
                .matches
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if record.end(ended_by, at) {
                EndOutcome::Ended(record.clone())
            } else {
                EndOutcome::AlreadyEnded(record.clone())
            }
        };

        if let EndOutcome::Ended(record) = &outcome {
            self.active_pairs
                .remove_if(&record.pair(), |_, active| *active == record.id);
        }
        Ok(outcome)
    }

    fn active_for_pair(&self, pair: CanonicalPair) -> Result<Option<Match>, StoreError> {
        let id = match self.active_pairs.get(&pair) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self
            .matches
            .get(&id)
            .filter(|m| m.is_active())
            .map(|m| m.clone()))
    }

    fn latest_for_pair(&self, pair: CanonicalPair) -> Result<Option<Match>, StoreError> {
        let id = match self.history.get(&pair).and_then(|ids| ids.last().copied()) {
            Some(id) => id,
            None => return Ok(None),
        };
        self.get(id)
    }

    fn active_for_user(&self, user: UserId) -> Result<Vec<Match>, StoreError> {
        let ids: Vec<MatchId> = self
            .by_user
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        Ok(ids
            .into_iter()
            .filter_map(|id| self.matches.get(&id).map(|m| m.clone()))
            .filter(|m| m.is_active())
            .collect())
    }
}

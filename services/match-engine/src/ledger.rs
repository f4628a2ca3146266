//! Swipe ledger
//!
//! Append-mostly record of swipe actions and the source of truth for match
//! detection. Upserts are idempotent: repeating the stored action writes
//! nothing and reports `is_new_or_changed = false`.

use std::sync::Arc;

use tracing::debug;
use types::errors::SwipeError;
use types::ids::UserId;
use types::swipe::{validate_pair, Swipe, SwipeAction};

use crate::store::SwipeStore;

/// Result of `record_swipe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSwipe {
    pub swipe: Swipe,
    pub is_new_or_changed: bool,
}

/// Swipe ledger over a `SwipeStore`
#[derive(Clone)]
pub struct SwipeLedger {
    store: Arc<dyn SwipeStore>,
}

impl SwipeLedger {
    pub fn new(store: Arc<dyn SwipeStore>) -> Self {
        Self { store }
    }

    /// Record a swipe (durable upsert)
    pub fn record_swipe(
        &self,
        actor: UserId,
        target: UserId,
        action: SwipeAction,
        at: i64,
    ) -> Result<RecordedSwipe, SwipeError> {
        validate_pair(actor, target)?;

        let outcome = self.store.upsert(actor, target, action, at)?;
        let is_new_or_changed = outcome.is_new_or_changed();

        debug!(
            actor = %actor,
            target = %target,
            action = %action,
            changed = is_new_or_changed,
            "Swipe recorded"
        );

        Ok(RecordedSwipe {
            swipe: outcome.swipe().clone(),
            is_new_or_changed,
        })
    }

    /// Record a swipe whose action arrives as text
    pub fn record_swipe_str(
        &self,
        actor: UserId,
        target: UserId,
        action: &str,
        at: i64,
    ) -> Result<RecordedSwipe, SwipeError> {
        let action: SwipeAction = action.parse()?;
        self.record_swipe(actor, target, action, at)
    }

    pub fn get(&self, actor: UserId, target: UserId) -> Result<Option<Swipe>, SwipeError> {
        Ok(self.store.get(actor, target)?)
    }

    /// The positive swipe from `target` toward `actor`, if any
    pub fn reciprocal_positive(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Result<Option<Swipe>, SwipeError> {
        Ok(self
            .store
            .get(target, actor)?
            .filter(|s| s.action.is_positive()))
    }

    /// All swipes made by `actor`, oldest first
    pub fn history(&self, actor: UserId) -> Result<Vec<Swipe>, SwipeError> {
        let mut swipes = self.store.swipes_by(actor)?;
        swipes.sort_by_key(|s| (s.created_at, *s.id.as_uuid()));
        Ok(swipes)
    }

    /// All swipes received by `target`
    pub fn received(&self, target: UserId) -> Result<Vec<Swipe>, SwipeError> {
        Ok(self.store.swipes_toward(target)?)
    }
}

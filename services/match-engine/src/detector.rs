//! Match detector
//!
//! After a positive swipe is recorded, checks for a positive reciprocal
//! swipe and creates the match through `MatchStore::insert_if_absent`.
//!
//! Two positive swipes racing from both sides may both observe reciprocity
//! and both attempt the insert. The store admits exactly one; the loser
//! sees `StoreError::PairConflict`, which is the normal "already matched"
//! path here and never an error to the caller. Only the winner publishes
//! `MatchCreated`.
//!
//! Each side writes its swipe before reading the other's, so at least one
//! of two concurrent swipers observes reciprocity: no match is missed.

use std::sync::Arc;

use tracing::{debug, info};
use types::errors::MatchError;
use types::ids::{MatchId, UserId};
use types::matching::{CanonicalPair, Match};

use crate::events::{self, EventSink};
use crate::store::{EndOutcome, MatchStore, StoreError, SwipeStore};

/// Outcome of `try_create_match`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchAttempt {
    /// This call created the match and published MatchCreated
    Created(Match),
    /// The pair already has an active match (possibly created concurrently)
    AlreadyMatched(Match),
    /// The actor's own swipe is missing or not positive
    NotPositive,
    /// No positive swipe from the target yet
    NoReciprocal,
    /// The pair's last match ended after both swipes were made
    EndedNotRenewed { previous: MatchId },
}

impl MatchAttempt {
    pub fn created(&self) -> bool {
        matches!(self, MatchAttempt::Created(_))
    }

    pub fn record(&self) -> Option<&Match> {
        match self {
            MatchAttempt::Created(m) | MatchAttempt::AlreadyMatched(m) => Some(m),
            _ => None,
        }
    }
}

/// Outcome of `end_match`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedMatch {
    pub record: Match,
    /// False when the match had already ended (no-op)
    pub changed: bool,
}

/// Match detector
#[derive(Clone)]
pub struct MatchDetector {
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchStore>,
    sink: Arc<dyn EventSink>,
}

impl MatchDetector {
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            swipes,
            matches,
            sink,
        }
    }

    /// Create the match for (actor, target) if both sides swiped positively
    pub fn try_create_match(
        &self,
        actor: UserId,
        target: UserId,
        at: i64,
    ) -> Result<MatchAttempt, MatchError> {
        let pair = match CanonicalPair::new(actor, target) {
            Some(pair) => pair,
            None => return Ok(MatchAttempt::NotPositive),
        };

        let own = match self.swipes.get(actor, target)? {
            Some(s) if s.action.is_positive() => s,
            _ => return Ok(MatchAttempt::NotPositive),
        };
        let reciprocal = match self.swipes.get(target, actor)? {
            Some(s) if s.action.is_positive() => s,
            _ => return Ok(MatchAttempt::NoReciprocal),
        };

        // An ended match is only renewed by swipes made after it ended
        if let Some(previous) = self.matches.latest_for_pair(pair)? {
            if let Some(ended_at) = previous.ended_at {
                if own.created_at <= ended_at || reciprocal.created_at <= ended_at {
                    debug!(
                        match_id = %previous.id,
                        actor = %actor,
                        target = %target,
                        "Reciprocal swipes predate ended match, not renewing"
                    );
                    return Ok(MatchAttempt::EndedNotRenewed {
                        previous: previous.id,
                    });
                }
            }
        }

        match self.matches.insert_if_absent(Match::new(pair, at)) {
            Ok(record) => {
                info!(
                    match_id = %record.id,
                    user_low = %record.user_low_id,
                    user_high = %record.user_high_id,
                    "Match created"
                );
                self.sink.publish(events::match_created(&record));
                Ok(MatchAttempt::Created(record))
            }
            Err(StoreError::PairConflict { existing }) => {
                debug!(match_id = %existing, "Pair already matched");
                let record = self.matches.get(existing)?.ok_or(MatchError::NotFound {
                    match_id: existing.to_string(),
                })?;
                Ok(MatchAttempt::AlreadyMatched(record))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// End a match on behalf of one participant
    ///
    /// Idempotent: ending an ended match returns the stored record with
    /// `changed = false` and publishes nothing.
    pub fn end_match(
        &self,
        match_id: MatchId,
        ended_by: UserId,
        at: i64,
    ) -> Result<EndedMatch, MatchError> {
        let record = self.matches.get(match_id)?.ok_or(MatchError::NotFound {
            match_id: match_id.to_string(),
        })?;
        if !record.involves(ended_by) {
            return Err(MatchError::NotParticipant {
                match_id: match_id.to_string(),
                user_id: ended_by.to_string(),
            });
        }

        match self.matches.end(match_id, ended_by, at)? {
            EndOutcome::Ended(record) => {
                info!(match_id = %record.id, ended_by = %ended_by, "Match ended");
                if let Some(event) = events::match_ended(&record) {
                    self.sink.publish(event);
                }
                Ok(EndedMatch {
                    record,
                    changed: true,
                })
            }
            EndOutcome::AlreadyEnded(record) => {
                debug!(match_id = %record.id, "Match already ended");
                Ok(EndedMatch {
                    record,
                    changed: false,
                })
            }
        }
    }
}

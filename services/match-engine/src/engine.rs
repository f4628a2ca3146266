//! Match engine core
//!
//! Main coordinator for the swipe path: ledger write, reciprocity check,
//! conditional match insert, event emission.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use types::errors::{MatchError, SwipeError};
use types::ids::{MatchId, UserId};
use types::matching::{CanonicalPair, Match};
use types::swipe::{validate_pair, Swipe, SwipeAction};

use crate::detector::{EndedMatch, MatchAttempt, MatchDetector};
use crate::events::EventSink;
use crate::ledger::SwipeLedger;
use crate::store::{MatchStore, SwipeStore};

/// Match engine configuration
#[derive(Debug, Clone)]
pub struct MatchEngineConfig {
    /// Keep a swipe immutable while its pair has an active match. A
    /// superseding swipe is then reported as unchanged instead of written.
    pub freeze_swipes_while_matched: bool,
    /// Exclude users who passed on the viewer from the viewer's feed
    pub exclude_passed_by: bool,
}

impl Default for MatchEngineConfig {
    fn default() -> Self {
        Self {
            freeze_swipes_while_matched: true,
            exclude_passed_by: true,
        }
    }
}

/// Result of submitting a swipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeOutcome {
    pub swipe: Swipe,
    pub is_new_or_changed: bool,
    /// True only for the call that created the match
    pub matched: bool,
    /// Active match for the pair, if any
    pub match_id: Option<MatchId>,
}

/// Match engine service
#[derive(Clone)]
pub struct MatchEngine {
    config: MatchEngineConfig,
    ledger: SwipeLedger,
    detector: MatchDetector,
    matches: Arc<dyn MatchStore>,
}

impl MatchEngine {
    /// Create a new match engine with default configuration
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(MatchEngineConfig::default(), swipes, matches, sink)
    }

    /// Create a new match engine with custom configuration
    pub fn with_config(
        config: MatchEngineConfig,
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            ledger: SwipeLedger::new(swipes.clone()),
            detector: MatchDetector::new(swipes, matches.clone(), sink),
            matches,
        }
    }

    pub fn ledger(&self) -> &SwipeLedger {
        &self.ledger
    }

    pub fn detector(&self) -> &MatchDetector {
        &self.detector
    }

    /// Submit a swipe
    ///
    /// Positive swipes always run detection, even when the ledger reports
    /// no change, so a retry after a failure between the ledger write and
    /// the match insert still produces the match.
    pub fn swipe(
        &self,
        actor: UserId,
        target: UserId,
        action: SwipeAction,
        at: i64,
    ) -> Result<SwipeOutcome, SwipeError> {
        validate_pair(actor, target)?;

        if self.config.freeze_swipes_while_matched {
            if let Some(frozen) = self.frozen_swipe(actor, target)? {
                return Ok(frozen);
            }
        }

        let recorded = self.ledger.record_swipe(actor, target, action, at)?;

        if !action.is_positive() {
            return Ok(SwipeOutcome {
                swipe: recorded.swipe,
                is_new_or_changed: recorded.is_new_or_changed,
                matched: false,
                match_id: None,
            });
        }

        let attempt = self
            .detector
            .try_create_match(actor, target, at)
            .map_err(|e| SwipeError::Storage {
                message: e.to_string(),
            })?;

        Ok(SwipeOutcome {
            swipe: recorded.swipe,
            is_new_or_changed: recorded.is_new_or_changed,
            matched: attempt.created(),
            match_id: attempt.record().map(|m| m.id),
        })
    }

    /// Submit a swipe whose action arrives as text
    pub fn swipe_str(
        &self,
        actor: UserId,
        target: UserId,
        action: &str,
        at: i64,
    ) -> Result<SwipeOutcome, SwipeError> {
        let action: SwipeAction = action.parse()?;
        self.swipe(actor, target, action, at)
    }

    /// Run detection for a pair without recording a swipe
    pub fn try_create_match(
        &self,
        actor: UserId,
        target: UserId,
        at: i64,
    ) -> Result<MatchAttempt, MatchError> {
        self.detector.try_create_match(actor, target, at)
    }

    pub fn end_match(
        &self,
        match_id: MatchId,
        ended_by: UserId,
        at: i64,
    ) -> Result<EndedMatch, MatchError> {
        self.detector.end_match(match_id, ended_by, at)
    }

    /// End every active match of `user` (account deletion)
    ///
    /// Returns the matches this call transitioned.
    pub fn end_matches_for_user(&self, user: UserId, at: i64) -> Result<Vec<Match>, MatchError> {
        let mut ended = Vec::new();
        for record in self.matches.active_for_user(user)? {
            let result = self.detector.end_match(record.id, user, at)?;
            if result.changed {
                ended.push(result.record);
            }
        }
        Ok(ended)
    }

    pub fn get_match(&self, match_id: MatchId) -> Result<Match, MatchError> {
        self.matches.get(match_id)?.ok_or(MatchError::NotFound {
            match_id: match_id.to_string(),
        })
    }

    pub fn active_matches(&self, user: UserId) -> Result<Vec<Match>, MatchError> {
        Ok(self.matches.active_for_user(user)?)
    }

    /// Users who must never appear in `user`'s feed
    ///
    /// Everyone `user` already swiped on, everyone in an active match with
    /// `user`, and (when configured) everyone who passed on `user`. Users
    /// who liked `user` stay eligible; excluding them would make a match
    /// unreachable.
    pub fn excluded_candidates(&self, user: UserId) -> Result<HashSet<UserId>, MatchError> {
        let map_err = |e: SwipeError| MatchError::Storage {
            message: e.to_string(),
        };

        let mut excluded: HashSet<UserId> = self
            .ledger
            .history(user)
            .map_err(map_err)?
            .into_iter()
            .map(|s| s.target_id)
            .collect();

        if self.config.exclude_passed_by {
            excluded.extend(
                self.ledger
                    .received(user)
                    .map_err(map_err)?
                    .into_iter()
                    .filter(|s| s.action == SwipeAction::Pass)
                    .map(|s| s.actor_id),
            );
        }

        for record in self.matches.active_for_user(user)? {
            if let Some(partner) = record.pair().partner_of(user) {
                excluded.insert(partner);
            }
        }

        debug!(user = %user, excluded = excluded.len(), "Computed feed exclusions");
        Ok(excluded)
    }

    /// The stored swipe, unchanged, when the pair is in an active match
    fn frozen_swipe(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Result<Option<SwipeOutcome>, SwipeError> {
        let pair = match CanonicalPair::new(actor, target) {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let active = self
            .matches
            .active_for_pair(pair)
            .map_err(|e| SwipeError::Storage {
                message: e.to_string(),
            })?;
        let active = match active {
            Some(active) => active,
            None => return Ok(None),
        };

        match self.ledger.get(actor, target)? {
            Some(swipe) => {
                debug!(
                    actor = %actor,
                    target = %target,
                    match_id = %active.id,
                    "Swipe frozen by active match"
                );
                Ok(Some(SwipeOutcome {
                    swipe,
                    is_new_or_changed: false,
                    matched: false,
                    match_id: Some(active.id),
                }))
            }
            None => {
                warn!(
                    actor = %actor,
                    target = %target,
                    match_id = %active.id,
                    "Active match without a stored swipe"
                );
                Ok(None)
            }
        }
    }
}

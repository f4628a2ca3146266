//! Match types
//!
//! A match is the mutually-consented pairing of two users. It is keyed by
//! the canonical pair so that storage can enforce one active match per
//! unordered pair with a single uniqueness constraint.

use crate::ids::{MatchId, UserId};
use serde::{Deserialize, Serialize};

/// Unordered user pair in canonical `(low, high)` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalPair {
    low: UserId,
    high: UserId,
}

impl CanonicalPair {
    /// Order two distinct users. Returns None for a self-pair.
    pub fn new(a: UserId, b: UserId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// The other member of the pair, if `user` is a member
    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        if user == self.low {
            Some(self.high)
        } else if user == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// Match lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Active,
    Ended,
}

/// Match record
///
/// Invariant: `user_low_id < user_high_id`. Never hard-deleted; ending is
/// a one-way transition recorded in `ended_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub user_low_id: UserId,
    pub user_high_id: UserId,
    pub matched_at: i64,
    pub ended_at: Option<i64>,
    pub ended_by: Option<UserId>,
}

impl Match {
    /// Create an active match for a canonical pair
    pub fn new(pair: CanonicalPair, matched_at: i64) -> Self {
        Self {
            id: MatchId::new(),
            user_low_id: pair.low(),
            user_high_id: pair.high(),
            matched_at,
            ended_at: None,
            ended_by: None,
        }
    }

    pub fn pair(&self) -> CanonicalPair {
        CanonicalPair {
            low: self.user_low_id,
            high: self.user_high_id,
        }
    }

    pub fn status(&self) -> MatchStatus {
        if self.ended_at.is_some() {
            MatchStatus::Ended
        } else {
            MatchStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.pair().contains(user)
    }

    /// Transition to ENDED. Returns false if already ended (no-op).
    pub fn end(&mut self, ended_by: UserId, at: i64) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.ended_at = Some(at);
        self.ended_by = Some(ended_by);
        true
    }
}

//! Feed types
//!
//! Scored candidates are ephemeral: they live inside a cached feed
//! snapshot and in responses, never in durable storage.

use crate::ids::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-component breakdown of a candidate score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// 0..=40
    pub interest_score: Decimal,
    /// 0..=30
    pub age_score: Decimal,
    /// 0..=30
    pub preference_score: Decimal,
}

/// A candidate with its score, as ranked for one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate_id: UserId,
    /// 0..=100
    pub score: Decimal,
    pub components: ScoreComponents,
    /// Tie-break keys, copied from the candidate profile
    #[serde(skip)]
    pub last_active_at: i64,
    #[serde(skip)]
    pub created_at: i64,
}

/// One page of a user's feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub candidates: Vec<ScoredCandidate>,
    pub has_more: bool,
    /// Snapshot position to request the following page from
    pub next_offset: usize,
    /// Live candidates in the snapshot the page was cut from
    pub total: usize,
    /// Served from an expired snapshot because the candidate store failed
    pub stale: bool,
    pub computed_at: i64,
}

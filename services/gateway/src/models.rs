use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::feed::{FeedPage, ScoredCandidate};
use types::ids::{MatchId, UserId};
use types::matching::{Match, MatchStatus};

// Ids arrive as strings and are parsed in handlers so a malformed id is a
// 400 with the field name, not a generic JSON rejection.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub actor_id: String,
    pub target_id: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub user_id: String,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub candidate_id: UserId,
    pub score: Decimal,
    pub interest_score: Decimal,
    pub age_score: Decimal,
    pub preference_score: Decimal,
}

impl From<&ScoredCandidate> for CandidateView {
    fn from(c: &ScoredCandidate) -> Self {
        Self {
            candidate_id: c.candidate_id,
            score: c.score,
            interest_score: c.components.interest_score,
            age_score: c.components.age_score,
            preference_score: c.components.preference_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub candidates: Vec<CandidateView>,
    pub has_more: bool,
    /// Offset to pass for the following page
    pub next_offset: usize,
    pub stale: bool,
}

impl From<&FeedPage> for FeedResponse {
    fn from(page: &FeedPage) -> Self {
        Self {
            candidates: page.candidates.iter().map(CandidateView::from).collect(),
            has_more: page.has_more,
            next_offset: page.next_offset,
            stale: page.stale,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMatchRequest {
    pub ended_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMatchResponse {
    pub match_id: MatchId,
    pub ended_at: Option<i64>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub match_id: MatchId,
    pub user_low_id: UserId,
    pub user_high_id: UserId,
    pub status: MatchStatus,
    pub matched_at: i64,
    pub ended_at: Option<i64>,
    pub ended_by: Option<UserId>,
}

impl From<&Match> for MatchView {
    fn from(m: &Match) -> Self {
        Self {
            match_id: m.id,
            user_low_id: m.user_low_id,
            user_high_id: m.user_high_id,
            status: m.status(),
            matched_at: m.matched_at,
            ended_at: m.ended_at,
            ended_by: m.ended_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAck {
    pub event_id: types::ids::EventId,
    pub duplicate: bool,
}

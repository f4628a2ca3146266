//! Error types for the match and feed engine
//!
//! Taxonomy:
//! - `ValidationError`: rejected synchronously, never retried
//! - `SwipeError` / `MatchError`: ledger and detector failures
//! - `FeedError`: feed reads, including upstream unavailability
//! - `EventProcessingError`: listener failures (event left unacknowledged)
//!
//! Duplicate match creation is deliberately absent here: the detector
//! consumes the storage conflict and reports "already matched".

use thiserror::Error;

/// Input validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Self-swipe rejected: actor and target are both {user_id}")]
    SelfSwipe { user_id: String },

    #[error("Invalid swipe action: {0}")]
    InvalidAction(String),

    #[error("Malformed {field}: {value:?}")]
    MalformedId { field: &'static str, value: String },

    #[error("Invalid page: limit {limit} (max {max})")]
    InvalidPage { limit: usize, max: usize },
}

/// Swipe ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwipeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {message}")]
    Storage { message: String },
}

/// Match lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Match not found: {match_id}")]
    NotFound { match_id: String },

    #[error("User {user_id} is not a participant of match {match_id}")]
    NotParticipant { match_id: String, user_id: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

/// Feed read errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    /// Candidate store unreachable and no snapshot to fall back on.
    /// Never papered over with an empty feed.
    #[error("Feed temporarily unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Consistency listener errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventProcessingError {
    #[error("Match error while applying event: {0}")]
    Match(#[from] MatchError),

    #[error("Upstream error while applying event: {reason}")]
    Upstream { reason: String },
}

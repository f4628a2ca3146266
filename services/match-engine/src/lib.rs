//! Match Engine Service
//!
//! Turns unilateral swipes into mutually-consented matches.
//!
//! **Components:**
//! - `ledger`: swipe ledger, one idempotent upsert per (actor, target)
//! - `detector`: reciprocity check and atomic match creation
//! - `store`: storage boundary with the conditional-insert contract
//! - `events`: outbound MatchCreated / MatchEnded publication
//!
//! **Key Invariants:**
//! - At most one active match per unordered user pair
//! - Concurrent reciprocal swipes produce exactly one match
//! - MatchCreated / MatchEnded published once per transition
//! - Ending a match is idempotent

pub mod store;
pub mod ledger;
pub mod detector;
pub mod events;
pub mod engine;

pub use engine::{MatchEngine, MatchEngineConfig, SwipeOutcome};

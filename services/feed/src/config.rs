//! Feed engine configuration

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scoring weights and tolerances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Maximum interest-overlap component
    pub interest_max: Decimal,
    /// Maximum age-compatibility component
    pub age_max: Decimal,
    /// Maximum preference-alignment component
    pub preference_max: Decimal,
    /// Years outside the viewer's age range over which the age score
    /// decays linearly to zero
    pub age_grace_years: u8,
    /// Drop candidates failing mutual preferences before scoring
    pub exclude_preference_mismatch: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            interest_max: Decimal::from(40),
            age_max: Decimal::from(30),
            preference_max: Decimal::from(30),
            age_grace_years: 5,
            exclude_preference_mismatch: true,
        }
    }
}

/// Feed cache configuration
#[derive(Debug, Clone)]
pub struct FeedCacheConfig {
    /// Snapshot validity
    pub ttl: Duration,
    /// Page size when the caller does not specify one
    pub default_page_size: usize,
    /// Largest accepted page
    pub max_page_size: usize,
    /// Upper bound on candidate ids requested from the store
    pub max_pool_size: usize,
    /// Budget for one recompute against the candidate store
    pub upstream_timeout: Duration,
    /// How long past expiry a snapshot may still be served as the stale
    /// fallback; `FeedCache::sweep` drops it after that
    pub max_stale: Duration,
}

impl Default for FeedCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            default_page_size: 20,
            max_page_size: 100,
            max_pool_size: 500,
            upstream_timeout: Duration::from_secs(2),
            max_stale: Duration::from_secs(3600),
        }
    }
}

/// What happens to other users' feeds when a user is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletedUserPolicy {
    /// Leave other snapshots alone; the deleted user disappears when they
    /// expire and the directory no longer returns them
    TtlExpiry,
    /// Remove the deleted user from every cached feed immediately
    EagerScrub,
}

impl std::str::FromStr for DeletedUserPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TTL_EXPIRY" | "TTL" => Ok(DeletedUserPolicy::TtlExpiry),
            "EAGER_SCRUB" | "EAGER" => Ok(DeletedUserPolicy::EagerScrub),
            other => Err(format!("unknown deleted-user policy: {other}")),
        }
    }
}

/// Consistency listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Recently applied event ids remembered for short-circuiting
    /// redeliveries
    pub dedup_window: usize,
    pub deleted_user_policy: DeletedUserPolicy,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            dedup_window: 10_000,
            deleted_user_policy: DeletedUserPolicy::TtlExpiry,
        }
    }
}

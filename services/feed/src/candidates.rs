//! Candidate store interface
//!
//! Read-only view of the external user directory: attributes for scoring
//! and the pool of ids eligible for a viewer. `NotFound` means the user no
//! longer exists and the caller excludes them; `Unavailable` is an
//! upstream failure.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use types::ids::UserId;
use types::profile::{Gender, Preferences, UserProfile};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateStoreError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Candidate store unavailable: {0}")]
    Unavailable(String),
}

/// Coarse filters pushed down to the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolFilters {
    pub min_age: u8,
    pub max_age: u8,
    /// Empty means any gender
    pub genders: BTreeSet<Gender>,
    pub limit: usize,
}

impl PoolFilters {
    /// Filters for a viewer: their age range widened by the grace band so
    /// near-miss candidates can still be scored
    pub fn for_viewer(preferences: &Preferences, age_grace_years: u8, limit: usize) -> Self {
        Self {
            min_age: preferences.min_age.saturating_sub(age_grace_years),
            max_age: preferences.max_age.saturating_add(age_grace_years),
            genders: preferences.interested_in.clone(),
            limit,
        }
    }

    pub fn admits(&self, profile: &UserProfile) -> bool {
        profile.age >= self.min_age
            && profile.age <= self.max_age
            && (self.genders.is_empty() || self.genders.contains(&profile.gender))
    }
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_user_attributes(&self, user_id: UserId)
        -> Result<UserProfile, CandidateStoreError>;

    async fn get_candidate_pool(
        &self,
        user_id: UserId,
        filters: &PoolFilters,
    ) -> Result<Vec<UserId>, CandidateStoreError>;
}

/// In-process user directory
///
/// Used by tests and local runs. Latency and outages can be injected to
/// exercise timeout and serve-stale paths.
#[derive(Default)]
pub struct InMemoryDirectory {
    profiles: DashMap<UserId, UserProfile>,
    latency_ms: AtomicU64,
    unavailable: AtomicBool,
    pool_queries: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id, profile);
    }

    pub fn remove(&self, user_id: UserId) -> Option<UserProfile> {
        self.profiles.remove(&user_id).map(|(_, p)| p)
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of pool queries served, i.e. feed recomputes
    pub fn pool_queries(&self) -> usize {
        self.pool_queries.load(Ordering::SeqCst)
    }

    async fn simulate_upstream(&self) -> Result<(), CandidateStoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CandidateStoreError::Unavailable(
                "directory offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for InMemoryDirectory {
    async fn get_user_attributes(
        &self,
        user_id: UserId,
    ) -> Result<UserProfile, CandidateStoreError> {
        self.simulate_upstream().await?;
        self.profiles
            .get(&user_id)
            .map(|p| p.clone())
            .ok_or(CandidateStoreError::NotFound(user_id))
    }

    async fn get_candidate_pool(
        &self,
        user_id: UserId,
        filters: &PoolFilters,
    ) -> Result<Vec<UserId>, CandidateStoreError> {
        self.simulate_upstream().await?;
        if !self.profiles.contains_key(&user_id) {
            return Err(CandidateStoreError::NotFound(user_id));
        }
        self.pool_queries.fetch_add(1, Ordering::SeqCst);

        let mut ids: Vec<UserId> = self
            .profiles
            .iter()
            .filter(|p| p.user_id != user_id && filters.admits(p.value()))
            .map(|p| p.user_id)
            .collect();
        ids.sort();
        ids.truncate(filters.limit);
        Ok(ids)
    }
}

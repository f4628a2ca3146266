//! Per-actor swipe rate limiting
//!
//! One token allowance per actor, refilled continuously. An allowance that
//! has refilled to the burst size is equivalent to a fresh one, so it is
//! evicted; the map only holds actors who swiped recently.

use crate::error::AppError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use types::ids::UserId;

/// Checks between opportunistic evictions
pub const EVICT_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Allowance {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket per swiping user
pub struct SwipeRateLimiter {
    burst: f64,
    per_sec: f64,
    allowances: DashMap<UserId, Allowance>,
    checks: AtomicU64,
}

impl SwipeRateLimiter {
    /// Burst of `per_sec` swipes, refilled at `per_sec` per second
    pub fn new(per_sec: u32) -> Self {
        let per_sec = f64::from(per_sec.max(1));
        Self {
            burst: per_sec,
            per_sec,
            allowances: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, actor: UserId) -> Result<(), AppError> {
        self.check_at(actor, Instant::now())
    }

    fn check_at(&self, actor: UserId, now: Instant) -> Result<(), AppError> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.evict_idle_at(now);
        }

        let admitted = {
            let mut allowance = self.allowances.entry(actor).or_insert(Allowance {
                tokens: self.burst,
                refilled_at: now,
            });
            let available = self.available(&allowance, now);
            allowance.refilled_at = allowance.refilled_at.max(now);
            if available >= 1.0 {
                allowance.tokens = available - 1.0;
                true
            } else {
                allowance.tokens = available;
                false
            }
        };

        if admitted {
            Ok(())
        } else {
            tracing::debug!(actor = %actor, "Swipe rate limited");
            Err(AppError::RateLimitExceeded(format!("Swipe rate for {}", actor)))
        }
    }

    /// Drop allowances that have refilled to the burst size
    ///
    /// Returns the number evicted.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.allowances.len();
        self.allowances
            .retain(|_, allowance| self.available(allowance, now) < self.burst);
        before.saturating_sub(self.allowances.len())
    }

    /// Actors currently holding an allowance
    pub fn tracked(&self) -> usize {
        self.allowances.len()
    }

    fn available(&self, allowance: &Allowance, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(allowance.refilled_at);
        (allowance.tokens + elapsed.as_secs_f64() * self.per_sec).min(self.burst)
    }
}

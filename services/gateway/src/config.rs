use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, Result};
use feed_engine::{DeletedUserPolicy, FeedCacheConfig, ListenerConfig, ScoringConfig};
use tracing::{info, warn};

/// Gateway settings, read from `MATCHFEED_*` environment variables
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub feed_ttl_secs: u64,
    /// How long an expired feed may still be served while the directory
    /// is failing
    pub feed_max_stale_secs: u64,
    pub sweep_interval_secs: u64,
    pub upstream_timeout_ms: u64,
    pub age_grace_years: u8,
    /// Base URL of the user directory; in-memory directory when unset
    pub directory_url: Option<String>,
    pub deleted_user_policy: DeletedUserPolicy,
    pub swipe_rate_per_sec: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            feed_ttl_secs: 300,
            feed_max_stale_secs: 3600,
            sweep_interval_secs: 60,
            upstream_timeout_ms: 2_000,
            age_grace_years: 5,
            directory_url: None,
            deleted_user_policy: DeletedUserPolicy::TtlExpiry,
            swipe_rate_per_sec: 20,
        }
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("MATCHFEED_PORT", "8080")?,
            feed_ttl_secs: try_load("MATCHFEED_FEED_TTL_SECS", "300")?,
            feed_max_stale_secs: try_load("MATCHFEED_FEED_MAX_STALE_SECS", "3600")?,
            sweep_interval_secs: try_load("MATCHFEED_SWEEP_INTERVAL_SECS", "60")?,
            upstream_timeout_ms: try_load("MATCHFEED_UPSTREAM_TIMEOUT_MS", "2000")?,
            age_grace_years: try_load("MATCHFEED_AGE_GRACE_YEARS", "5")?,
            directory_url: var("MATCHFEED_DIRECTORY_URL").ok(),
            deleted_user_policy: try_load("MATCHFEED_DELETED_USER_POLICY", "TTL_EXPIRY")?,
            swipe_rate_per_sec: try_load("MATCHFEED_SWIPE_RATE_PER_SEC", "20")?,
        })
    }

    pub fn cache_config(&self) -> FeedCacheConfig {
        FeedCacheConfig {
            ttl: Duration::from_secs(self.feed_ttl_secs),
            max_stale: Duration::from_secs(self.feed_max_stale_secs),
            upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
            ..FeedCacheConfig::default()
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            age_grace_years: self.age_grace_years,
            ..ScoringConfig::default()
        }
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            deleted_user_policy: self.deleted_user_policy,
            ..ListenerConfig::default()
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("{key} not set, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("Environment misconfigured: {key}: {e}")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_configs() {
        let config = GatewayConfig {
            feed_ttl_secs: 60,
            feed_max_stale_secs: 600,
            sweep_interval_secs: 0,
            upstream_timeout_ms: 250,
            age_grace_years: 2,
            deleted_user_policy: DeletedUserPolicy::EagerScrub,
            ..GatewayConfig::default()
        };
        assert_eq!(config.cache_config().ttl, Duration::from_secs(60));
        assert_eq!(config.cache_config().max_stale, Duration::from_secs(600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert_eq!(config.cache_config().upstream_timeout, Duration::from_millis(250));
        assert_eq!(config.scoring_config().age_grace_years, 2);
        assert_eq!(
            config.listener_config().deleted_user_policy,
            DeletedUserPolicy::EagerScrub
        );
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        assert!(try_load::<u16>("MATCHFEED_TEST_UNSET_PORT", "not-a-port").is_err());
        assert_eq!(try_load::<u16>("MATCHFEED_TEST_UNSET_PORT", "8080").unwrap(), 8080);
        assert_eq!(
            try_load::<DeletedUserPolicy>("MATCHFEED_TEST_UNSET_POLICY", "EAGER_SCRUB").unwrap(),
            DeletedUserPolicy::EagerScrub
        );
    }
}

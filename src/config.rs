//! Process-wide throttling configuration.
//!
//! Values are fixed at start-up. The defaults allow a user to check 20,000
//! contacts per 10 days against the full user set, and 20,000 contacts per day
//! against recent changes.

use crate::domain::bucket::BucketLimit;
use crate::domain::pool::Pool;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error returned when a configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A bucket that holds nothing would reject every request
    #[error("max_contacts must be greater than 0")]
    ZeroMaxContacts,
    /// Incremental buckets would never drain
    #[error("s2_period must be greater than 0")]
    ZeroS2Period,
    /// Full buckets would never drain and nothing would stay in the change log
    #[error("s2_delta must be greater than 0")]
    ZeroS2Delta,
}

/// Throttling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Bucket capacity shared by both pools, in identifiers (default: 20000)
    #[serde(default = "default_max_contacts")]
    pub max_contacts: u32,

    /// Time for an incremental bucket to drain (default: 1 day)
    ///
    /// Read and written as `s2_period_secs`; fractional seconds are kept.
    #[serde(
        rename = "s2_period_secs",
        with = "duration_secs",
        default = "default_s2_period"
    )]
    pub s2_period: Duration,

    /// Time for a full bucket to drain, and change log retention (default: 10 days)
    #[serde(
        rename = "s2_delta_secs",
        with = "duration_secs",
        default = "default_s2_delta"
    )]
    pub s2_delta: Duration,
}

fn default_max_contacts() -> u32 {
    20_000
}

fn default_s2_period() -> Duration {
    Duration::from_secs(86_400)
}

fn default_s2_delta() -> Duration {
    Duration::from_secs(864_000)
}

/// Durations as a number of seconds: whole seconds as integers, anything
/// finer as a float.
mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_contacts: default_max_contacts(),
            s2_period: default_s2_period(),
            s2_delta: default_s2_delta(),
        }
    }
}

impl ThrottleConfig {
    /// Build a configuration from durations, kept at full precision.
    pub fn new(max_contacts: u32, s2_period: Duration, s2_delta: Duration) -> Self {
        Self {
            max_contacts,
            s2_period,
            s2_delta,
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns the first zero-valued setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_contacts == 0 {
            return Err(ConfigError::ZeroMaxContacts);
        }
        if self.s2_period.is_zero() {
            return Err(ConfigError::ZeroS2Period);
        }
        if self.s2_delta.is_zero() {
            return Err(ConfigError::ZeroS2Delta);
        }
        Ok(())
    }

    /// Drain period of incremental buckets.
    pub fn s2_period(&self) -> Duration {
        self.s2_period
    }

    /// Drain period of full buckets.
    pub fn s2_delta(&self) -> Duration {
        self.s2_delta
    }

    /// How long change events stay visible to incremental syncs.
    pub fn retention_window(&self) -> Duration {
        self.s2_delta()
    }

    /// Bucket limits for both pools.
    pub fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            full: BucketLimit::new(self.max_contacts, self.s2_delta()),
            incremental: BucketLimit::new(self.max_contacts, self.s2_period()),
        }
    }
}

/// Per-pool bucket limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Limit for full syncs
    pub full: BucketLimit,
    /// Limit for incremental syncs
    pub incremental: BucketLimit,
}

impl PoolLimits {
    /// Limit applied to a pool.
    pub fn for_pool(&self, pool: Pool) -> BucketLimit {
        match pool {
            Pool::Full => self.full,
            Pool::Incremental => self.incremental,
        }
    }
}

impl Default for PoolLimits {
    fn default() -> Self {
        ThrottleConfig::default().pool_limits()
    }
}

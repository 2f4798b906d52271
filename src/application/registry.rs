//! Registry of per-user quota buckets.
//!
//! The registry owns one leaky bucket per `(identifier, pool)` pair, created
//! lazily on first use. A reservation is a single read-modify-write under the
//! storage's per-key lock, so two concurrent requests can never both spend the
//! same remaining quota.

use crate::application::ports::Storage;
use crate::config::PoolLimits;
use crate::domain::{bucket::LeakyBucket, identifier::Identifier, pool::Pool};
use crate::infrastructure::storage::ShardedStorage;
use std::time::Instant;

/// Key of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// The user being limited
    pub identifier: Identifier,
    /// The pool being charged
    pub pool: Pool,
}

impl BucketKey {
    /// Create a key.
    pub fn new(identifier: Identifier, pool: Pool) -> Self {
        Self { identifier, pool }
    }
}

/// Result of a quota reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The quota was consumed
    Allowed,
    /// Not enough quota; nothing was consumed
    RateLimited,
}

impl Reservation {
    /// Check if this reservation is Allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Reservation::Allowed)
    }

    /// Check if this reservation is RateLimited.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Reservation::RateLimited)
    }
}

/// Registry managing every user's quota buckets.
///
/// Generic over the storage backend; in production this is a
/// [`ShardedStorage`], which keeps unrelated users from contending.
#[derive(Debug)]
pub struct RateLimiterRegistry<S = ShardedStorage<BucketKey, LeakyBucket>>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    storage: S,
    limits: PoolLimits,
}

impl RateLimiterRegistry {
    /// Create a registry backed by a fresh sharded map.
    pub fn with_limits(limits: PoolLimits) -> Self {
        Self::new(ShardedStorage::new(), limits)
    }
}

impl<S> RateLimiterRegistry<S>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    /// Create a registry over `storage` with per-pool limits.
    pub fn new(storage: S, limits: PoolLimits) -> Self {
        Self { storage, limits }
    }

    /// Atomically reserve `cost` units of `pool` quota for `identifier`.
    ///
    /// A cost above the pool capacity is refused without creating a bucket.
    pub fn reserve(
        &self,
        identifier: &Identifier,
        pool: Pool,
        cost: usize,
        now: Instant,
    ) -> Reservation {
        let limit = self.limits.for_pool(pool);
        if cost > limit.capacity as usize {
            return Reservation::RateLimited;
        }

        let key = BucketKey::new(identifier.clone(), pool);
        let allowed = self.storage.with_entry_mut(
            key,
            || LeakyBucket::new(limit, now),
            |bucket| bucket.try_consume(cost, now),
        );

        if allowed {
            Reservation::Allowed
        } else {
            Reservation::RateLimited
        }
    }

    /// Consumed quota of a bucket at `now`; zero if the bucket does not exist.
    pub fn level(&self, identifier: &Identifier, pool: Pool, now: Instant) -> f64 {
        let key = BucketKey::new(identifier.clone(), pool);
        self.storage
            .with_entry(&key, |bucket| bucket.effective_level(now))
            .unwrap_or(0.0)
    }

    /// Whole units still available to a user in a pool at `now`.
    pub fn remaining(&self, identifier: &Identifier, pool: Pool, now: Instant) -> u32 {
        let key = BucketKey::new(identifier.clone(), pool);
        self.storage
            .with_entry(&key, |bucket| bucket.remaining(now))
            .unwrap_or(self.limits.for_pool(pool).capacity)
    }

    /// Drop every bucket that has fully drained at `now`.
    ///
    /// Returns the number of buckets dropped. A dropped bucket behaves exactly
    /// like the fresh one that replaces it, so this never changes a decision.
    pub fn cleanup(&self, now: Instant) -> usize {
        let mut dropped = 0;
        self.storage.retain(|_, bucket| {
            if bucket.is_drained(now) {
                dropped += 1;
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Per-pool limits in force.
    pub fn limits(&self) -> PoolLimits {
        self.limits
    }

    /// Get the number of live buckets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Forget every bucket.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

//! Leaky bucket quota counter.
//!
//! A bucket tracks how much quota a user has consumed. Consumed quota drains
//! continuously at `capacity / drain_period`, so a bucket left alone for a full
//! drain period is empty again no matter how full it was.

use std::time::{Duration, Instant};

/// Capacity and drain period shared by every bucket of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLimit {
    /// Maximum consumed quota, counted in identifiers
    pub capacity: u32,
    /// Time for a completely full bucket to drain to empty
    pub drain_period: Duration,
}

impl BucketLimit {
    /// Create a limit.
    ///
    /// Zero values are rejected by configuration validation before a limit is
    /// ever built; a zero `drain_period` here simply means "never drains".
    pub fn new(capacity: u32, drain_period: Duration) -> Self {
        Self {
            capacity,
            drain_period,
        }
    }

    /// Drain rate in identifiers per second.
    pub fn leak_rate(&self) -> f64 {
        let secs = self.drain_period.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            f64::from(self.capacity) / secs
        }
    }
}

/// A single per-(user, pool) quota counter with linear drain.
///
/// # Example
/// ```
/// use discovery_throttle::{BucketLimit, LeakyBucket};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = LeakyBucket::new(BucketLimit::new(3, Duration::from_secs(3)), start);
///
/// assert!(bucket.try_consume(3, start));
/// assert!(!bucket.try_consume(1, start));
///
/// // One second later a third of the capacity has drained
/// assert!(bucket.try_consume(1, start + Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LeakyBucket {
    level: f64,
    limit: BucketLimit,
    last_update: Instant,
}

impl LeakyBucket {
    /// Create an empty bucket.
    pub fn new(limit: BucketLimit, now: Instant) -> Self {
        Self {
            level: 0.0,
            limit,
            last_update: now,
        }
    }

    /// Consumed quota as seen at `now`, after draining.
    pub fn effective_level(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update);
        if self.limit.drain_period.is_zero() {
            return self.level;
        }
        if elapsed >= self.limit.drain_period {
            return 0.0;
        }
        let ratio = elapsed.as_secs_f64() / self.limit.drain_period.as_secs_f64();
        let drained = ratio * f64::from(self.limit.capacity);
        (self.level - drained).max(0.0)
    }

    /// Try to consume `amount` identifiers worth of quota at `now`.
    ///
    /// Returns `true` and records the consumption if it fits under capacity.
    /// A rejection leaves the bucket untouched, including its drain clock, so
    /// repeated rejected attempts cannot stall the drain.
    pub fn try_consume(&mut self, amount: usize, now: Instant) -> bool {
        let capacity = f64::from(self.limit.capacity);
        if amount > self.limit.capacity as usize {
            return false;
        }

        let level = self.effective_level(now);
        let next = level + amount as f64;
        if next > capacity {
            return false;
        }

        self.level = next;
        // Concurrent callers may sample the clock out of order
        if now > self.last_update {
            self.last_update = now;
        }
        true
    }

    /// Whether the bucket has fully drained at `now`.
    ///
    /// A drained bucket is equivalent to a freshly created one and can be
    /// dropped without changing any future decision.
    pub fn is_drained(&self, now: Instant) -> bool {
        self.effective_level(now) <= 0.0
    }

    /// Quota still available at `now`, rounded down to whole identifiers.
    pub fn remaining(&self, now: Instant) -> u32 {
        let free = f64::from(self.limit.capacity) - self.effective_level(now);
        free.max(0.0).floor() as u32
    }

    /// Stored level as of the last accepted consumption.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Time of the last accepted consumption (or creation).
    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// The limit this bucket enforces.
    pub fn limit(&self) -> BucketLimit {
        self.limit
    }
}

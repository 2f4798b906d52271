//! Observability metrics for sync evaluation.
//!
//! Counters only; identifiers are never recorded here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking sync decisions and housekeeping.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Syncs that passed the quota check
    syncs_allowed: AtomicU64,
    /// Syncs refused for lack of quota
    syncs_rate_limited: AtomicU64,
    /// Requests refused by the authenticator
    authentication_failures: AtomicU64,
    /// Requests with a missing or undecodable body
    malformed_requests: AtomicU64,
    /// Identifiers charged against quota in allowed syncs
    identifiers_probed: AtomicU64,
    /// Drained buckets dropped by cleanup
    buckets_evicted: AtomicU64,
    /// Expired change events dropped by pruning
    changes_pruned: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_allowed(&self, identifiers: usize) {
        self.inner.syncs_allowed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .identifiers_probed
            .fetch_add(identifiers as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rate_limited(&self) {
        self.inner.syncs_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_authentication_failure(&self) {
        self.inner
            .authentication_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.inner.malformed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_buckets_evicted(&self, count: usize) {
        self.inner
            .buckets_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_changes_pruned(&self, count: usize) {
        self.inner
            .changes_pruned
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of syncs allowed.
    pub fn syncs_allowed(&self) -> u64 {
        self.inner.syncs_allowed.load(Ordering::Relaxed)
    }

    /// Get the total number of syncs refused for lack of quota.
    pub fn syncs_rate_limited(&self) -> u64 {
        self.inner.syncs_rate_limited.load(Ordering::Relaxed)
    }

    /// Requests rejected by the authenticator.
    pub fn authentication_failures(&self) -> u64 {
        self.inner.authentication_failures.load(Ordering::Relaxed)
    }

    /// Requests with a missing or undecodable body.
    pub fn malformed_requests(&self) -> u64 {
        self.inner.malformed_requests.load(Ordering::Relaxed)
    }

    /// Get the total number of identifiers charged in allowed syncs.
    pub fn identifiers_probed(&self) -> u64 {
        self.inner.identifiers_probed.load(Ordering::Relaxed)
    }

    /// Drained buckets dropped by sweeps.
    pub fn buckets_evicted(&self) -> u64 {
        self.inner.buckets_evicted.load(Ordering::Relaxed)
    }

    /// Expired change events dropped by sweeps.
    pub fn changes_pruned(&self) -> u64 {
        self.inner.changes_pruned.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            syncs_allowed: self.syncs_allowed(),
            syncs_rate_limited: self.syncs_rate_limited(),
            authentication_failures: self.authentication_failures(),
            malformed_requests: self.malformed_requests(),
            identifiers_probed: self.identifiers_probed(),
            buckets_evicted: self.buckets_evicted(),
            changes_pruned: self.changes_pruned(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        let inner = &self.inner;
        for counter in [
            &inner.syncs_allowed,
            &inner.syncs_rate_limited,
            &inner.authentication_failures,
            &inner.malformed_requests,
            &inner.identifiers_probed,
            &inner.buckets_evicted,
            &inner.changes_pruned,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub syncs_allowed: u64,
    pub syncs_rate_limited: u64,
    pub authentication_failures: u64,
    pub malformed_requests: u64,
    pub identifiers_probed: u64,
    pub buckets_evicted: u64,
    pub changes_pruned: u64,
}

impl MetricsSnapshot {
    /// Share of syncs that reached the quota check and were refused (0.0 to 1.0).
    ///
    /// Returns 0.0 if no sync reached the quota check.
    pub fn rejection_rate(&self) -> f64 {
        let checked = self.syncs_allowed.saturating_add(self.syncs_rate_limited);
        if checked == 0 {
            0.0
        } else {
            self.syncs_rate_limited as f64 / checked as f64
        }
    }

    /// Every request that received a result, whatever the result.
    pub fn total_requests(&self) -> u64 {
        self.syncs_allowed
            .saturating_add(self.syncs_rate_limited)
            .saturating_add(self.authentication_failures)
            .saturating_add(self.malformed_requests)
    }
}

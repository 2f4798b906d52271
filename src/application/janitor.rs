//! Background housekeeping for buckets and change history.
//!
//! Neither drained buckets nor expired change events affect any decision, so
//! removing them is purely a memory concern. The janitor does it on a fixed
//! interval, or on demand through [`Janitor::sweep`].

use crate::application::changelog::ChangeLog;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::registry::{BucketKey, RateLimiterRegistry};
use crate::domain::bucket::LeakyBucket;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

#[cfg(feature = "async")]
use tracing::info;

/// Error returned when janitor configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JanitorConfigError {
    /// Sweep interval must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroInterval,
}

/// Configuration for periodic sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Time between two sweeps
    pub interval: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl JanitorConfig {
    /// Create a config with the given sweep interval.
    ///
    /// # Errors
    /// Returns `JanitorConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, JanitorConfigError> {
        if interval.is_zero() {
            return Err(JanitorConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }
}

/// What a single sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub buckets_evicted: usize,
    pub changes_pruned: usize,
}

/// Removes drained buckets and expired change events.
pub struct Janitor<S = ShardedStorage<BucketKey, LeakyBucket>>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    registry: Arc<RateLimiterRegistry<S>>,
    changes: Arc<ChangeLog>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    config: JanitorConfig,
}

impl<S> Clone for Janitor<S>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            changes: Arc::clone(&self.changes),
            clock: Arc::clone(&self.clock),
            metrics: self.metrics.clone(),
            config: self.config,
        }
    }
}

impl<S> Janitor<S>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    /// Create a janitor sweeping `registry` and `changes`.
    pub fn new(
        registry: Arc<RateLimiterRegistry<S>>,
        changes: Arc<ChangeLog>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        config: JanitorConfig,
    ) -> Self {
        Self {
            registry,
            changes,
            clock,
            metrics,
            config,
        }
    }

    /// Run one sweep at the current clock time.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let report = SweepReport {
            buckets_evicted: self.registry.cleanup(now),
            changes_pruned: self.changes.prune(now),
        };

        self.metrics.record_buckets_evicted(report.buckets_evicted);
        self.metrics.record_changes_pruned(report.changes_pruned);
        trace!(
            buckets_evicted = report.buckets_evicted,
            changes_pruned = report.changes_pruned,
            buckets_live = self.registry.len(),
            "janitor sweep"
        );
        report
    }

    /// Start sweeping periodically on the current tokio runtime.
    ///
    /// The first sweep runs immediately. The task runs until the returned
    /// handle is shut down or dropped.
    #[cfg(feature = "async")]
    pub fn start(self) -> JanitorHandle
    where
        S: 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let interval = self.config.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "janitor started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("janitor stopped");
        });

        JanitorHandle { shutdown_tx, task }
    }

    /// Sweep settings.
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Registry swept for drained buckets.
    pub fn registry(&self) -> &Arc<RateLimiterRegistry<S>> {
        &self.registry
    }

    /// Time source used for each sweep.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Error returned when the janitor task does not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The task panicked while sweeping
    #[error("janitor task panicked")]
    Panicked,
    /// The task was aborted before it could stop
    #[error("janitor task was cancelled")]
    Cancelled,
}

/// Handle to a running janitor task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct JanitorHandle {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "async")]
impl JanitorHandle {
    /// Signal the task to stop and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was aborted.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        // The receiver is gone only if the task already ended
        let _ = self.shutdown_tx.send(true);
        self.task.await.map_err(|error| {
            if error.is_panic() {
                ShutdownError::Panicked
            } else {
                ShutdownError::Cancelled
            }
        })
    }
}

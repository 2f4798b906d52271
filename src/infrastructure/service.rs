//! Composition root.
//!
//! [`DiscoveryService`] wires the stores, the evaluator and the janitor
//! together behind one handle. Request handlers call `full_sync` or
//! `incremental_sync` with the raw body; the registration path calls
//! `register_user` and `remove_user`.

use crate::application::{
    changelog::ChangeLog,
    evaluator::SyncEvaluator,
    janitor::{Janitor, JanitorConfig, JanitorConfigError, SweepReport},
    metrics::Metrics,
    ports::{Authenticator, Clock, RequestDecoder},
    registration::RegistrationFeed,
    registry::RateLimiterRegistry,
    user_set::UserSet,
};
use crate::config::{ConfigError, ThrottleConfig};
use crate::domain::{identifier::Identifier, pool::Pool, sync::SyncOutcome};
use crate::infrastructure::{clock::SystemClock, codec::JsonCodec};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[cfg(feature = "async")]
use crate::application::janitor::{JanitorHandle, ShutdownError};
#[cfg(feature = "async")]
use std::sync::Mutex;

/// Error returned when building a [`DiscoveryService`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Throttling configuration is invalid
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// No authenticator was supplied
    #[error("an authenticator is required")]
    MissingAuthenticator,
    /// Janitor configuration is invalid
    #[error("janitor configuration error: {0}")]
    Janitor(#[from] JanitorConfigError),
}

/// Builder for constructing a [`DiscoveryService`].
pub struct DiscoveryServiceBuilder {
    config: ThrottleConfig,
    clock: Option<Arc<dyn Clock>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    decoder: Option<Arc<dyn RequestDecoder>>,
    sweep_interval: Duration,
    background_sweeps: bool,
}

impl DiscoveryServiceBuilder {
    /// Set the throttling configuration.
    pub fn with_config(mut self, config: ThrottleConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the credential check. Required.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Set the request body format (default: [`JsonCodec`]).
    pub fn with_decoder(mut self, decoder: Arc<dyn RequestDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Set how often the janitor sweeps (default: 60 seconds).
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the janitor as a background task.
    ///
    /// **Requires the `async` feature** and a running tokio runtime at build
    /// time. Without it, call [`DiscoveryService::sweep`] yourself.
    pub fn with_background_sweeps(mut self, enabled: bool) -> Self {
        self.background_sweeps = enabled;
        self
    }

    /// Build the service.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration or sweep interval is invalid,
    /// or no authenticator was supplied.
    pub fn build(self) -> Result<DiscoveryService, BuildError> {
        self.config.validate()?;
        let janitor_config = JanitorConfig::new(self.sweep_interval)?;
        let authenticator = self
            .authenticator
            .ok_or(BuildError::MissingAuthenticator)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let decoder = self.decoder.unwrap_or_else(|| Arc::new(JsonCodec::new()));
        let metrics = Metrics::new();

        let limits = self.config.pool_limits();
        let registry = Arc::new(RateLimiterRegistry::with_limits(limits));
        let users = Arc::new(UserSet::new());
        let changes = Arc::new(ChangeLog::with_window(self.config.retention_window()));

        let evaluator = SyncEvaluator::new(
            Arc::clone(&registry),
            users.clone(),
            changes.clone(),
            authenticator,
            decoder,
            Arc::clone(&clock),
            metrics.clone(),
        );
        let feed = RegistrationFeed::new(users, Arc::clone(&changes), Arc::clone(&clock));
        let janitor = Janitor::new(registry, changes, clock, metrics, janitor_config);

        info!(
            max_contacts = self.config.max_contacts,
            full_drain_secs = self.config.s2_delta.as_secs_f64(),
            full_leak_per_sec = limits.full.leak_rate(),
            incremental_drain_secs = self.config.s2_period.as_secs_f64(),
            incremental_leak_per_sec = limits.incremental.leak_rate(),
            "discovery throttle configured"
        );

        #[cfg(feature = "async")]
        let janitor_handle = if self.background_sweeps {
            Some(janitor.clone().start())
        } else {
            None
        };
        #[cfg(not(feature = "async"))]
        let _ = self.background_sweeps;

        Ok(DiscoveryService {
            config: self.config,
            evaluator,
            feed,
            janitor,
            #[cfg(feature = "async")]
            janitor_handle: Arc::new(Mutex::new(janitor_handle)),
        })
    }
}

/// Contact discovery with per-user throttling.
///
/// Cheap to share: wrap it in an `Arc` and call it from any number of request
/// handlers concurrently.
pub struct DiscoveryService {
    config: ThrottleConfig,
    evaluator: SyncEvaluator,
    feed: RegistrationFeed,
    janitor: Janitor,
    #[cfg(feature = "async")]
    janitor_handle: Arc<Mutex<Option<JanitorHandle>>>,
}

impl DiscoveryService {
    /// Create a builder for configuring the service.
    ///
    /// Defaults:
    /// - Configuration: [`ThrottleConfig::default`]
    /// - Clock: [`SystemClock`]
    /// - Decoder: [`JsonCodec`]
    /// - Sweep interval: 60 seconds, background sweeps disabled
    pub fn builder() -> DiscoveryServiceBuilder {
        DiscoveryServiceBuilder {
            config: ThrottleConfig::default(),
            clock: None,
            authenticator: None,
            decoder: None,
            sweep_interval: JanitorConfig::default().interval,
            background_sweeps: false,
        }
    }

    /// Answer a full sync request body.
    pub fn full_sync(&self, body: Option<&[u8]>) -> SyncOutcome {
        self.evaluator.full_sync(body)
    }

    /// Answer an incremental sync request body.
    pub fn incremental_sync(&self, body: Option<&[u8]>) -> SyncOutcome {
        self.evaluator.incremental_sync(body)
    }

    /// Register an identifier. Returns `false` if it was already registered.
    pub fn register_user(&self, identifier: impl Into<Identifier>) -> bool {
        self.feed.register(identifier.into())
    }

    /// Deregister an identifier. Returns `false` if it was not registered.
    pub fn remove_user(&self, identifier: &Identifier) -> bool {
        self.feed.deregister(identifier)
    }

    /// Consumed quota of a user in a pool, right now.
    pub fn quota_level(&self, identifier: &Identifier, pool: Pool) -> f64 {
        self.janitor
            .registry()
            .level(identifier, pool, self.janitor.clock().now())
    }

    /// Drop drained buckets and expired change events now.
    pub fn sweep(&self) -> SweepReport {
        self.janitor.sweep()
    }

    /// Configuration the service was built with.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Evaluator answering both sync kinds.
    pub fn evaluator(&self) -> &SyncEvaluator {
        &self.evaluator
    }

    /// Quota buckets of every requester.
    pub fn registry(&self) -> &Arc<RateLimiterRegistry> {
        self.janitor.registry()
    }

    /// Currently registered identifiers.
    pub fn users(&self) -> &Arc<UserSet> {
        self.feed.users()
    }

    /// Recent registration changes.
    pub fn changes(&self) -> &Arc<ChangeLog> {
        self.feed.changes()
    }

    /// Get observability metrics.
    pub fn metrics(&self) -> &Metrics {
        self.evaluator.metrics()
    }

    /// Stop the background janitor, if running.
    ///
    /// **Requires the `async` feature.**
    ///
    /// # Errors
    /// Returns `ShutdownError` if the janitor task did not stop cleanly.
    #[cfg(feature = "async")]
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // Take the handle while holding the lock, then release the lock before awaiting
        let handle = match self.janitor_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            handle.shutdown().await?;
        }
        Ok(())
    }
}

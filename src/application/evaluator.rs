//! Sync request evaluation.
//!
//! Each request runs through a fixed sequence of checks and exits at the
//! first one that fails:
//!
//! 1. the body must be present and decodable
//! 2. the external authenticator must accept the credentials
//! 3. the requester's quota in the pool of the sync kind must cover the cost
//!
//! Only then are the candidates compared against registration state. A
//! rejected request never touches the user set or the change log, so it
//! learns nothing beyond "try later".

use crate::application::metrics::Metrics;
use crate::application::ports::{
    Authenticator, ChangeIndex, Clock, MembershipIndex, RequestDecoder, Storage,
};
use crate::application::registry::{BucketKey, RateLimiterRegistry};
use crate::domain::{
    bucket::LeakyBucket,
    pool::SyncKind,
    sync::{SyncOutcome, SyncRequest, SyncResult},
};
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless evaluator of full and incremental syncs.
///
/// All shared state lives behind the registry and the two read ports, so one
/// evaluator can serve any number of concurrent requests.
pub struct SyncEvaluator<S = ShardedStorage<BucketKey, LeakyBucket>>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    registry: Arc<RateLimiterRegistry<S>>,
    users: Arc<dyn MembershipIndex>,
    changes: Arc<dyn ChangeIndex>,
    authenticator: Arc<dyn Authenticator>,
    decoder: Arc<dyn RequestDecoder>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl<S> Clone for SyncEvaluator<S>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            users: Arc::clone(&self.users),
            changes: Arc::clone(&self.changes),
            authenticator: Arc::clone(&self.authenticator),
            decoder: Arc::clone(&self.decoder),
            clock: Arc::clone(&self.clock),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S> SyncEvaluator<S>
where
    S: Storage<BucketKey, LeakyBucket>,
{
    /// Create a new evaluator.
    ///
    /// # Arguments
    /// * `registry` - Quota buckets charged by every admitted request
    /// * `users` - Registered identifiers, answering full syncs
    /// * `changes` - Recent registration changes, answering incremental syncs
    /// * `authenticator` - External credential check
    /// * `decoder` - Request body format
    /// * `clock` - Time source for quota and window calculations
    /// * `metrics` - Counters updated with every decision
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<RateLimiterRegistry<S>>,
        users: Arc<dyn MembershipIndex>,
        changes: Arc<dyn ChangeIndex>,
        authenticator: Arc<dyn Authenticator>,
        decoder: Arc<dyn RequestDecoder>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        Self {
            registry,
            users,
            changes,
            authenticator,
            decoder,
            clock,
            metrics,
        }
    }

    /// Evaluate a full sync: which candidates are registered right now.
    pub fn full_sync(&self, body: Option<&[u8]>) -> SyncOutcome {
        self.evaluate(SyncKind::Full, body)
    }

    /// Evaluate an incremental sync: which candidates changed recently.
    pub fn incremental_sync(&self, body: Option<&[u8]>) -> SyncOutcome {
        self.evaluate(SyncKind::Incremental, body)
    }

    /// Evaluate a raw request body received on the entry point for `kind`.
    ///
    /// A missing or empty body yields `RequestDataMissing`; a body that does
    /// not decode yields `RequestDataInvalid`. Neither touches any state.
    pub fn evaluate(&self, kind: SyncKind, body: Option<&[u8]>) -> SyncOutcome {
        let body = match body {
            Some(body) if !body.is_empty() => body,
            _ => {
                debug!(kind = %kind, "sync request without body");
                self.metrics.record_malformed();
                return SyncOutcome::rejected(SyncResult::RequestDataMissing);
            }
        };

        match self.decoder.decode(body) {
            Ok(request) => self.evaluate_request(kind, &request),
            Err(error) => {
                debug!(kind = %kind, error = %error, "sync request rejected as invalid");
                self.metrics.record_malformed();
                SyncOutcome::rejected(SyncResult::RequestDataInvalid)
            }
        }
    }

    /// Evaluate an already decoded request.
    pub fn evaluate_request(&self, kind: SyncKind, request: &SyncRequest) -> SyncOutcome {
        let user = request.user.fingerprint();

        if !self
            .authenticator
            .verify(&request.user, &request.auth_token)
        {
            debug!(kind = %kind, user = %user, "sync authentication failed");
            self.metrics.record_authentication_failure();
            return SyncOutcome::rejected(SyncResult::AuthenticationInvalid);
        }

        let cost = request.cost();
        if cost == 0 {
            self.metrics.record_allowed(0);
            return SyncOutcome::success(Vec::new(), Vec::new());
        }

        let pool = kind.pool();
        let now = self.clock.now();
        if self
            .registry
            .reserve(&request.user, pool, cost, now)
            .is_rate_limited()
        {
            warn!(kind = %kind, pool = %pool, user = %user, cost, "sync rate limited");
            self.metrics.record_rate_limited();
            return SyncOutcome::rejected(SyncResult::RateLimitExceeded);
        }
        self.metrics.record_allowed(cost);

        let outcome = match kind {
            SyncKind::Full => {
                SyncOutcome::success(self.users.matches(&request.identifiers), Vec::new())
            }
            SyncKind::Incremental => {
                let diff = self.changes.diff_against(&request.identifiers, now);
                SyncOutcome::success(diff.added, diff.removed)
            }
        };

        debug!(
            kind = %kind,
            user = %user,
            cost,
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            "sync served"
        );
        outcome
    }

    /// Quota buckets charged by this evaluator.
    pub fn registry(&self) -> &Arc<RateLimiterRegistry<S>> {
        &self.registry
    }

    /// Metrics shared with this evaluator.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

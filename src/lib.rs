//! # discovery-throttle
//!
//! Rate limiting for private contact discovery.
//!
//! A contact discovery service lets a user submit the identifiers in their
//! address book and learn which of them are registered. Answered without
//! limits, the same endpoint lets an attacker enumerate the whole user base.
//! This crate bounds how many candidate identifiers each user may probe per
//! period, using one leaky bucket per user and sync kind.
//!
//! ## Quick Start
//!
//! ```rust
//! use discovery_throttle::{
//!     Authenticator, DiscoveryService, Identifier, JsonCodec, SyncRequest, SyncResult,
//!     ThrottleConfig,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct AcceptAll;
//!
//! impl Authenticator for AcceptAll {
//!     fn verify(&self, _user: &Identifier, _auth_token: &[u8]) -> bool {
//!         true
//!     }
//! }
//!
//! let service = DiscoveryService::builder()
//!     .with_config(ThrottleConfig::new(
//!         3,                          // identifiers per drain period
//!         Duration::from_secs(60),    // incremental drain period
//!         Duration::from_secs(600),   // full drain period and change retention
//!     ))
//!     .with_authenticator(Arc::new(AcceptAll))
//!     .build()
//!     .unwrap();
//!
//! service.register_user("bob");
//!
//! let request = SyncRequest::new(
//!     "alice",
//!     "token",
//!     vec![Identifier::from("bob"), Identifier::from("carol")],
//! );
//! let body = JsonCodec.encode_request(&request).unwrap();
//!
//! let outcome = service.full_sync(Some(&body[..]));
//! assert_eq!(outcome.result, SyncResult::Success);
//! assert_eq!(outcome.added, vec![Identifier::from("bob")]);
//!
//! // Two more candidates would exceed the quota of 3
//! let outcome = service.full_sync(Some(&body[..]));
//! assert_eq!(outcome.result, SyncResult::RateLimitExceeded);
//! assert!(outcome.added.is_empty());
//! ```
//!
//! ## Sync Kinds
//!
//! - **Full sync**: returns the candidates that are registered right now.
//!   Charged against the FULL pool, which drains over `s2_delta`.
//! - **Incremental sync**: returns the candidates added or removed within the
//!   retention window (`s2_delta`). Charged against the INCREMENTAL pool,
//!   which drains over `s2_period`.
//!
//! The two pools are independent. Both have capacity `max_contacts`, and the
//! sync kind is chosen by the entry point, never by the request body.
//!
//! ## Quota Accounting
//!
//! Each request costs the number of candidate identifiers it submits,
//! duplicates included, whatever the number of matches. A bucket's level
//! drains linearly from `capacity` to zero over its drain period:
//!
//! ```text
//! effective_level(now) = max(0, level - capacity * elapsed / drain_period)
//! ```
//!
//! A request is admitted if `effective_level + cost <= capacity`. A rejected
//! request leaves the bucket untouched, so a flood of rejections never delays
//! recovery. A request larger than the capacity is always rejected.
//!
//! ## Outcomes
//!
//! Every request maps to exactly one [`SyncResult`]:
//!
//! | Result | When | State touched |
//! |--------|------|---------------|
//! | `RequestDataMissing` | no body, or an empty one | none |
//! | `RequestDataInvalid` | the body does not decode | none |
//! | `AuthenticationInvalid` | the authenticator refused | none |
//! | `RateLimitExceeded` | not enough quota | none |
//! | `Success` | everything else | the requester's bucket |
//!
//! A rate-limited request is never compared against registration state.
//!
//! ## Housekeeping
//!
//! Drained buckets and expired change events never influence a decision,
//! but they do hold memory. [`DiscoveryService::sweep`] drops them; with the
//! `async` feature the janitor can do it periodically:
//!
//! ```rust,no_run
//! # use discovery_throttle::{Authenticator, DiscoveryService, Identifier};
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # struct AcceptAll;
//! # impl Authenticator for AcceptAll {
//! #     fn verify(&self, _: &Identifier, _: &[u8]) -> bool { true }
//! # }
//! # async fn example() {
//! let service = DiscoveryService::builder()
//!     .with_authenticator(Arc::new(AcceptAll))
//!     .with_sweep_interval(Duration::from_secs(30))
//!     .with_background_sweeps(true)
//!     .build()
//!     .unwrap();
//!
//! // Serve requests...
//!
//! service.shutdown().await.expect("shutdown failed");
//! # }
//! ```
//!
//! ## Observability
//!
//! Decisions are logged through `tracing`; identifiers only ever appear as
//! short fingerprints. Counters are available through [`Metrics`]:
//!
//! ```rust,no_run
//! # use discovery_throttle::{Authenticator, DiscoveryService, Identifier};
//! # use std::sync::Arc;
//! # struct AcceptAll;
//! # impl Authenticator for AcceptAll {
//! #     fn verify(&self, _: &Identifier, _: &[u8]) -> bool { true }
//! # }
//! # let service = DiscoveryService::builder()
//! #     .with_authenticator(Arc::new(AcceptAll))
//! #     .build()
//! #     .unwrap();
//! let snapshot = service.metrics().snapshot();
//! println!("Syncs allowed: {}", snapshot.syncs_allowed);
//! println!("Rejection rate: {:.2}%", snapshot.rejection_rate() * 100.0);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Process-wide settings
pub mod config;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::{BucketLimit, LeakyBucket},
    change::{ChangeDiff, ChangeEvent, ChangeHistory, ChangeKind},
    identifier::Identifier,
    pool::{Pool, SyncKind},
    sync::{SyncOutcome, SyncRequest, SyncResult},
};

pub use application::{
    changelog::ChangeLog,
    evaluator::SyncEvaluator,
    janitor::{Janitor, JanitorConfig, JanitorConfigError, SweepReport},
    metrics::{Metrics, MetricsSnapshot},
    ports::{
        Authenticator, ChangeIndex, Clock, DecodeError, MembershipIndex, RequestDecoder, Storage,
    },
    registration::RegistrationFeed,
    registry::{BucketKey, RateLimiterRegistry, Reservation},
    user_set::UserSet,
};

#[cfg(feature = "async")]
pub use application::janitor::{JanitorHandle, ShutdownError};

pub use config::{ConfigError, PoolLimits, ThrottleConfig};

pub use infrastructure::{
    clock::SystemClock,
    codec::JsonCodec,
    service::{BuildError, DiscoveryService, DiscoveryServiceBuilder},
    storage::ShardedStorage,
};

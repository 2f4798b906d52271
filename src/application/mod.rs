//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and owns the shared state:
//! - Rate limiter registry (per-user quota buckets)
//! - Change log and user set (registration state read by syncs)
//! - Sync evaluator (request decisions)
//! - Janitor (periodic cleanup)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod changelog;
pub mod evaluator;
pub mod janitor;
pub mod metrics;
pub mod ports;
pub mod registration;
pub mod registry;
pub mod user_set;

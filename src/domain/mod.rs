//! Domain layer - pure types with no shared state.
//!
//! This layer holds the concepts the rest of the crate is built from:
//! - Opaque user identifiers
//! - Quota pools and sync kinds
//! - The leaky bucket quota counter
//! - Registration change events and histories
//! - Request and outcome types
//!
//! Nothing here locks, spawns or reads a clock; time is always passed in.

pub mod bucket;
pub mod change;
pub mod identifier;
pub mod pool;
pub mod sync;

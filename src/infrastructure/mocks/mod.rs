//! Mock implementations for testing.
//!
//! This module provides test doubles for the ports the surrounding service
//! normally fills in, enabling deterministic tests of throttling behavior.

pub mod auth;
pub mod clock;
pub mod layer;

pub use auth::MockAuthenticator;
pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};

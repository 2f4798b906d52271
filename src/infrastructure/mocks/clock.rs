//! Manually driven clock.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock whose time only moves when a test moves it.
///
/// Bucket drain and change-log expiry are both functions of elapsed time, so
/// tests pin the clock and step it across drain periods and window edges.
///
/// # Examples
///
/// ```
/// use discovery_throttle::infrastructure::mocks::MockClock;
/// use discovery_throttle::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::starting_now();
/// let t0 = clock.now();
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), t0 + Duration::from_secs(10));
/// assert_eq!(clock.elapsed(), Duration::from_secs(10));
/// ```
///
/// Clones share the same time, so a clone handed to a service can be driven
/// from the test body:
///
/// ```
/// use discovery_throttle::infrastructure::mocks::MockClock;
/// use discovery_throttle::application::ports::Clock;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = MockClock::starting_now();
/// let shared: Arc<dyn Clock> = Arc::new(clock.clone());
///
/// clock.advance_secs(3);
/// assert_eq!(shared.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a clock pinned at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock pinned at the current instant.
    pub fn starting_now() -> Self {
        Self::new(Instant::now())
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += duration;
    }

    /// Move time forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Jump to a specific instant.
    pub fn set(&self, instant: Instant) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = instant;
    }

    /// The instant the clock was created at.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Time moved since creation.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.start)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock() {
        let start = Instant::now();
        let clock = MockClock::new(start);

        assert_eq!(clock.now(), start);

        clock.advance_secs(10);
        assert_eq!(clock.now(), start + Duration::from_secs(10));

        let new_time = start + Duration::from_secs(100);
        clock.set(new_time);
        assert_eq!(clock.now(), new_time);
        assert_eq!(clock.elapsed(), Duration::from_secs(100));
        assert_eq!(clock.start(), start);
    }
}

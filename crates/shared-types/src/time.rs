//! # Time Sources
//!
//! Every component reads the clock through `TimeSource` so TTLs, epochs and
//! staleness windows can be driven deterministically in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::entities::Timestamp;

/// Interface for getting the current time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Production time source using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Timestamp::new(duration.as_secs())
    }
}

/// A clock that only moves when told to.
///
/// Shared by clones, so a test can hold one handle and advance the clock
/// seen by every component built from the others.
#[derive(Debug, Clone, Default)]
pub struct ControllableTimeSource {
    current: Arc<AtomicU64>,
}

impl ControllableTimeSource {
    pub fn new(initial: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(initial)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ControllableTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controllable_clock_is_shared() {
        let clock = ControllableTimeSource::new(100);
        let other = clock.clone();
        clock.advance(61);
        assert_eq!(other.now().as_secs(), 161);
        other.set(5);
        assert_eq!(clock.now().as_secs(), 5);
    }

    #[test]
    fn test_system_clock_is_past_2020() {
        assert!(SystemTimeSource::new().now().as_secs() > 1_577_836_800);
    }
}

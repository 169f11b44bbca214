//! Time sources for scheduling decisions

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::Timestamp;

/// Source of the current time, in seconds since the epoch
///
/// `None` means the clock is unavailable. Scheduling treats that as "due"
/// rather than skipping a poll.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Option<Timestamp>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<Timestamp> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|elapsed| elapsed.as_secs())
    }
}

/// Manually driven clock
#[derive(Debug, Default)]
pub struct FixedClock {
    now: Mutex<Option<Timestamp>>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(Some(now)),
        }
    }

    /// A clock that always fails
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
    }

    /// Move the clock forward; no-op on an unavailable clock
    pub fn advance(&self, secs: u64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(t) = now.as_mut() {
            *t = t.saturating_add(secs);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Option<Timestamp> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        let now = SystemClock.now().unwrap();
        assert!(now > 1_577_836_800);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(100);
        assert_eq!(clock.now(), Some(100));
        clock.advance(50);
        assert_eq!(clock.now(), Some(150));
        clock.set(10);
        assert_eq!(clock.now(), Some(10));
    }

    #[test]
    fn test_unavailable_clock() {
        let clock = FixedClock::unavailable();
        clock.advance(10);
        assert_eq!(clock.now(), None);
    }
}

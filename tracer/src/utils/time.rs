//! Time source abstraction.
//!
//! The state machine stamps spans through a [`Clock`] so tests can drive
//! time deterministically.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Single-method time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: Mutex<i64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Mutex::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        *self.millis.lock() = millis;
    }

    pub fn advance(&self, delta_millis: i64) {
        *self.millis.lock() += delta_millis;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(*self.millis.lock()).unwrap_or_default()
    }
}

/// Epoch milliseconds for a timestamp.
pub fn millis(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(millis(&clock.now()), 1_000);
        clock.advance(250);
        assert_eq!(millis(&clock.now()), 1_250);
        clock.set(5_000);
        assert_eq!(millis(&clock.now()), 5_000);
    }
}

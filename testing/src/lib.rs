//! # Turnstile Testing
//!
//! Testing utilities for Turnstile reducers and stores.
//!
//! This crate provides:
//! - Deterministic clocks (fixed and manually advanced)
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effect descriptions
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_testing::{ManualClock, ReducerTest};
//!
//! let clock = ManualClock::starting_at_epoch();
//! ReducerTest::new(CheckinReducer::new())
//!     .with_env(test_environment(clock.clone()))
//!     .given_state(CheckinState::default())
//!     .when_action(CheckinAction::FrameDecoded { payload: "XYZ".into() })
//!     .then_state(|state| assert!(state.debouncer.is_processing()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use turnstile_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use turnstile_testing::mocks::FixedClock;
    /// use turnstile_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment under test.
    ///
    /// ```
    /// use std::time::Duration;
    /// use turnstile_core::environment::Clock;
    /// use turnstile_testing::mocks::ManualClock;
    ///
    /// let clock = ManualClock::starting_at_epoch();
    /// let start = clock.now();
    /// clock.advance(Duration::from_millis(2_999));
    /// assert_eq!((clock.now() - start).num_milliseconds(), 2_999);
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Create a clock frozen at the same instant as [`test_clock`]
        #[must_use]
        pub fn starting_at_epoch() -> Self {
            Self::new(test_clock().now())
        }

        /// Move the clock forward
        ///
        /// Advances that would overflow the calendar leave the clock unchanged.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(next) = chrono::Duration::from_std(by)
                .ok()
                .and_then(|by| time.checked_add_signed(by))
            {
                *time = next;
            }
        }

        /// Jump the clock to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at_epoch();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::from_secs(3));

        assert_eq!((clock.now() - start).num_seconds(), 3);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_at_epoch();
        let later = test_clock().now() + chrono::Duration::hours(1);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}

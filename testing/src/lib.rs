//! # Seatblock Testing
//!
//! Testing utilities for seatblock reducers.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given/When/Then harness for a single reducer step
//! - [`assertions`]: checks over the effects a reducer returned
//! - [`mocks`]: deterministic environment pieces such as [`FixedClock`]
//!
//! ## Example
//!
//! ```ignore
//! use seatblock_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(SubmissionReducer)
//!     .with_env(environment())
//!     .given_state(state_with_selection(&["1F-1-1"]))
//!     .when_action(SubmissionAction::RequestSubmit)
//!     .then_state(|s| assert!(s.submission.is_awaiting_label()))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use seatblock_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so timestamps recorded by reducers can
    /// be compared exactly.
    ///
    /// # Example
    ///
    /// ```
    /// use seatblock_testing::mocks::FixedClock;
    /// use seatblock_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
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

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

pub use mocks::{FixedClock, test_clock};

//! # Train Station Testing
//!
//! Testing utilities for the train station crates.
//!
//! This crate provides:
//! - [`InMemoryStore`]: re-exported from `train-station-memory`
//! - [`FixedClock`]: deterministic time
//! - [`TestWorld`]: a wired engine and query service with catalog builders
//! - [`properties`]: proptest strategies for layouts and seat requests
//!
//! ## Example
//!
//! ```ignore
//! use train_station_testing::{TestWorld, seats};
//!
//! #[tokio::test]
//! async fn test_order_flow() {
//!     let world = TestWorld::new();
//!     let fixture = world.journey(2, 10).await.unwrap();
//!
//!     let order = world
//!         .engine
//!         .submit_order(user, seats(fixture.id(), &[(1, 1), (1, 2)]))
//!         .await
//!         .unwrap();
//!     assert_eq!(order.tickets.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use train_station_core::environment::Clock;

pub mod fixtures;
pub mod properties;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use train_station_testing::mocks::FixedClock;
    /// use train_station_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
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

/// Install a test-writer tracing subscriber once per process.
///
/// Honours `RUST_LOG`; repeated calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::{JourneyFixture, TestWorld, seats};
pub use train_station_memory::{DEFAULT_LOCK_TIMEOUT, InMemoryStore, JourneyLock};
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }
}

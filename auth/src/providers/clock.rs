//! Time source.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Every expiry decision compares persisted timestamps against `now()`, so
/// tests can drive expiry deterministically with a mock clock.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

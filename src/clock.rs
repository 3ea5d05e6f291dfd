//! Time source abstraction for testability.
//!
//! The cache freshness check compares file modification times against
//! "now". Injecting the clock lets tests simulate elapsed time without
//! sleeping or touching real file timestamps.

use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

/// Trait for reading the current time.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

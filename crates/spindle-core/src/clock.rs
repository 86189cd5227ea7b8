//! Clock - 時刻の抽象化
//!
//! Task transitions carry wall-clock timestamps at nanosecond
//! resolution. The trait exists so tests can pin time and assert on
//! transition ordering deterministically.

use chrono::{DateTime, Utc};

/// Provides the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as nanoseconds since the Unix epoch.
    ///
    /// Saturates past the year 2262 rather than failing; transition
    /// timestamps are diagnostic data, not control flow.
    fn now_ns(&self) -> i64 {
        self.now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock: always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

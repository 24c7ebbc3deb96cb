//! Wall-clock timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since Unix epoch.
///
/// Returns 0 if the system clock is set before the epoch.
#[inline]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Current time as **microseconds** since Unix epoch.
#[inline]
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Timestamp source that never goes backwards, even if the wall clock does.
///
/// Each subscriber session owns one, so the timestamps it emits are
/// non-decreasing.
#[derive(Debug, Default)]
pub struct MonotonicMs {
    last: i64,
}

impl MonotonicMs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max(now_ms(), previous value)`.
    pub fn next(&mut self) -> i64 {
        self.observe(now_ms())
    }

    fn observe(&mut self, ts: i64) -> i64 {
        self.last = self.last.max(ts);
        self.last
    }
}

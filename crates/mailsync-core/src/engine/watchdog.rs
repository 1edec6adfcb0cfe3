//! Suspend detection.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Detects that the process slept through a check period.
///
/// Checked on a timer; when more wall-clock time than `interval + grace` has
/// passed since the previous check, the machine was most likely suspended and
/// the local state can no longer be trusted.
#[derive(Debug, Clone)]
pub struct WakeWatchdog {
    limit: TimeDelta,
    last_check: DateTime<Utc>,
}

impl WakeWatchdog {
    /// Creates a watchdog whose first period starts at `now`.
    #[must_use]
    pub fn new(interval: Duration, grace: Duration, now: DateTime<Utc>) -> Self {
        let limit = TimeDelta::from_std(interval + grace).unwrap_or(TimeDelta::MAX);
        Self {
            limit,
            last_check: now,
        }
    }

    /// Records a check at `now`. Returns true if the gap since the previous
    /// check exceeds the limit.
    pub fn check(&mut self, now: DateTime<Utc>) -> bool {
        let elapsed = now - self.last_check;
        self.last_check = now;
        elapsed > self.limit
    }
}

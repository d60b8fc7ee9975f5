use std::time::Duration;

use chrono::{DateTime, Utc};

/// Longest pause between two task polls.
pub const MAX_POLL_INTERVAL_SECS: u64 = 10;

/// How long repeated transient fetch failures are tolerated while polling.
pub const CONNECTION_FAILURE_TIMEOUT: Duration = Duration::from_secs(90);

/// Calculates the pause before the next poll of a running task.
///
/// Formula: min(poll_count, 10) seconds
///
/// # Examples
///
/// - Poll 1: 1s
/// - Poll 2: 2s
/// - Poll 9: 9s
/// - Poll 10+: 10s (capped)
pub fn poll_interval(poll_count: u32) -> Duration {
    Duration::from_secs(u64::from(poll_count).min(MAX_POLL_INTERVAL_SECS))
}

/// Per-wait record of the last successful task fetch.
///
/// Created at the start of one wait loop and handed by `&mut` to every
/// liveness check of that loop. Independent waits must not share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionFailureControl {
    pub last_success: DateTime<Utc>,
}

impl ConnectionFailureControl {
    pub fn new(last_success: DateTime<Utc>) -> Self {
        Self { last_success }
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_success = now;
    }

    /// Checks whether a failure observed at `now` still falls inside the
    /// tolerance window that started at the last successful fetch.
    pub fn within_tolerance(&self, now: DateTime<Utc>, tolerance: Duration) -> bool {
        let elapsed = now.signed_duration_since(self.last_success);

        match chrono::Duration::from_std(tolerance) {
            Ok(tolerance) => elapsed <= tolerance,
            // An unrepresentable window never runs out
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_ramp() {
        let observed: Vec<u64> = (1..=12).map(|i| poll_interval(i).as_secs()).collect();
        assert_eq!(observed, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10]);
    }

    #[test]
    fn test_poll_interval_stays_capped() {
        assert_eq!(poll_interval(500), Duration::from_secs(10));
        assert_eq!(poll_interval(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_within_tolerance() {
        let now = Utc::now();
        let control = ConnectionFailureControl::new(now);
        assert!(control.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));

        let recent = ConnectionFailureControl::new(now - chrono::Duration::seconds(30));
        assert!(recent.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));

        let stale = ConnectionFailureControl::new(now - chrono::Duration::seconds(100));
        assert!(!stale.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));
    }

    #[test]
    fn test_within_tolerance_exact_boundary() {
        let now = Utc::now();
        let control = ConnectionFailureControl::new(now - chrono::Duration::seconds(90));
        assert!(control.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));
    }

    #[test]
    fn test_record_success_resets_window() {
        let now = Utc::now();
        let mut control = ConnectionFailureControl::new(now - chrono::Duration::seconds(100));
        assert!(!control.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));

        control.record_success(now);
        assert!(control.within_tolerance(now, CONNECTION_FAILURE_TIMEOUT));
    }
}

//! Poll-round timing utilities shared by the room server and the cluster
//! coordinator: idle-shutdown eligibility tracking and catalog beacon
//! intervals.
//!
//! Neither type owns a socket or a task — they're pure bookkeeping a
//! `tokio::select!` loop consults each round to track "how long has this
//! been quiet" with a plain timestamp.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// How often a room's poll round times out waiting for socket readiness.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default grace period between a room becoming idle-eligible and it
/// actually shutting down.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracks whether a room is currently *eligible* for idle shutdown:
/// transient state entered when a poll round finds no stream connections
/// besides the listener itself, or a poll round times out with no
/// traffic. Eligibility converts into an actual shutdown once it has held
/// continuously for `timeout`; any incoming traffic clears it
/// immediately.
#[derive(Debug)]
pub struct IdleTracker {
    timeout: Duration,
    eligible_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, eligible_since: None }
    }

    /// Records a poll round with nothing happening. Eligibility starts
    /// counting from the *first* such round; later idle rounds don't push
    /// the deadline back out.
    pub fn mark_idle_round(&mut self, now: Instant) {
        if self.eligible_since.is_none() {
            debug!("room entering idle-shutdown eligibility");
            self.eligible_since = Some(now);
        }
    }

    /// Any traffic — a new connection, a received command — clears
    /// eligibility. Idempotent.
    pub fn mark_active(&mut self) {
        if self.eligible_since.take().is_some() {
            debug!("idle-shutdown eligibility cleared by traffic");
        }
    }

    /// Whether the room has been continuously eligible for at least
    /// `timeout` since eligibility began.
    pub fn should_shut_down(&self, now: Instant) -> bool {
        self.eligible_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.timeout)
    }

    /// Whether the tracker is currently in the eligible state at all
    /// (regardless of how long it's been).
    pub fn is_eligible(&self) -> bool {
        self.eligible_since.is_some()
    }
}

impl Default for IdleTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

/// A validated catalog-beacon interval. Construction is the only
/// validation step: `<= 0` disables registration outright, matching the
/// CLI/config convention
/// that room servers pass a negative interval since their discoverability
/// goes through the cluster rather than the catalog directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconInterval(Duration);

impl BeaconInterval {
    /// Builds an interval from a signed seconds value. Returns `None`
    /// (registration disabled) for zero or negative input.
    pub fn from_secs(seconds: i64) -> Option<Self> {
        if seconds <= 0 {
            None
        } else {
            Some(Self(Duration::from_secs(seconds as u64)))
        }
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_tracker_starts_ineligible() {
        let tracker = IdleTracker::new(Duration::from_secs(5));
        assert!(!tracker.is_eligible());
        assert!(!tracker.should_shut_down(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_idle_rounds_dont_push_the_deadline_out() {
        let mut tracker = IdleTracker::new(Duration::from_secs(5));
        tracker.mark_idle_round(Instant::now());
        tokio::time::advance(Duration::from_secs(3)).await;
        tracker.mark_idle_round(Instant::now()); // should not reset the clock
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(tracker.should_shut_down(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_clears_eligibility() {
        let mut tracker = IdleTracker::new(Duration::from_secs(5));
        tracker.mark_idle_round(Instant::now());
        tokio::time::advance(Duration::from_secs(4)).await;
        tracker.mark_active();
        assert!(!tracker.is_eligible());
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!tracker.should_shut_down(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_fires_once_timeout_elapses() {
        let mut tracker = IdleTracker::new(Duration::from_secs(5));
        tracker.mark_idle_round(Instant::now());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(tracker.should_shut_down(Instant::now()));
    }

    #[test]
    fn beacon_interval_disabled_for_non_positive_input() {
        assert!(BeaconInterval::from_secs(0).is_none());
        assert!(BeaconInterval::from_secs(-1).is_none());
    }

    #[test]
    fn beacon_interval_accepts_positive_seconds() {
        let interval = BeaconInterval::from_secs(30).unwrap();
        assert_eq!(interval.duration(), Duration::from_secs(30));
    }
}

//! Counters describing what a barrier has done so far.

use serde::Serialize;

/// Snapshot of barrier activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BarrierStats {
    /// Epochs opened by a registration on a quiescent barrier.
    pub epochs_started: u64,
    /// Epochs that drained back to quiescence.
    pub epochs_drained: u64,
    /// Animations added to the tracked set.
    pub animations_registered: u64,
    /// Animations whose signal was already settled at registration.
    pub animations_skipped: u64,
    /// Tracked animations removed by their own settlement.
    pub animations_settled: u64,
    /// Tracked animations removed by the fail-safe expiry.
    pub animations_expired: u64,
    /// Operations wrapped through the gate.
    pub requests_wrapped: u64,
    /// Gates released as soon as their operation settled.
    pub requests_released_immediately: u64,
    /// Gates released by a drain.
    pub requests_released_by_drain: u64,
    /// Gates cancelled before their operation settled.
    pub requests_cancelled: u64,
}

impl BarrierStats {
    /// Animations currently tracked according to these counters.
    pub fn animations_in_flight(&self) -> u64 {
        self.animations_registered - self.animations_settled - self.animations_expired
    }

    /// Requests not yet released or cancelled according to these counters.
    pub fn requests_in_flight(&self) -> u64 {
        self.requests_wrapped
            - self.requests_released_immediately
            - self.requests_released_by_drain
            - self.requests_cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default_is_zero() {
        let stats = BarrierStats::default();
        assert_eq!(stats.animations_in_flight(), 0);
        assert_eq!(stats.requests_in_flight(), 0);
    }

    #[test]
    fn test_in_flight_counts() {
        let stats = BarrierStats {
            animations_registered: 5,
            animations_settled: 2,
            animations_expired: 1,
            requests_wrapped: 4,
            requests_released_immediately: 1,
            requests_released_by_drain: 1,
            requests_cancelled: 1,
            ..Default::default()
        };
        assert_eq!(stats.animations_in_flight(), 2);
        assert_eq!(stats.requests_in_flight(), 1);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = BarrierStats {
            epochs_started: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["epochs_started"], 1);
        assert_eq!(json["requests_cancelled"], 0);
    }
}

//! Process-wide streak and aggregate statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::scoring::{finalize_match, AggregateStats, MatchState, MatchSummary, StreakState};
use super::setup::MatchConfig;

#[derive(Debug, Default)]
struct SessionInner {
    streak: StreakState,
    aggregate: AggregateStats,
}

/// Stats shared by every match of a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub aggregate: AggregateStats,
    pub streak: StreakState,
}

/// Shared handle to the session counters. Clones see the same counters.
#[derive(Clone, Default)]
pub struct SessionStats {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the streak for a decisive round and return it
    pub fn record_round_win(&self, winner_name: &str) -> StreakState {
        let mut inner = self.inner.lock();
        inner.streak.update(winner_name);
        inner.streak.clone()
    }

    /// Count a finished match
    pub fn record_match(&self, state: &MatchState, config: &MatchConfig) -> MatchSummary {
        let mut inner = self.inner.lock();
        finalize_match(state, config, &mut inner.aggregate)
    }

    pub fn aggregate(&self) -> AggregateStats {
        self.inner.lock().aggregate
    }

    pub fn streak(&self) -> StreakState {
        self.inner.lock().streak.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            aggregate: inner.aggregate,
            streak: inner.streak.clone(),
        }
    }

    /// Start a new session
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = SessionInner::default();
        info!("Session statistics reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let stats = SessionStats::new();
        let other = stats.clone();

        stats.record_round_win("Alice");
        other.record_round_win("Alice");

        assert_eq!(stats.streak().count, 2);
        assert_eq!(stats.streak().holder.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let stats = SessionStats::new();
        stats.record_round_win("Bob");
        stats.record_match(&MatchState::new(), &MatchConfig::default());
        assert_eq!(stats.aggregate().total_matches, 1);

        stats.reset();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.aggregate, AggregateStats::default());
        assert_eq!(snapshot.streak, StreakState::default());
    }
}

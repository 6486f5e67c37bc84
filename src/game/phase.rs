//! Toss phases and the delays between them

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One timed stage of a toss sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TossPhase {
    /// Anticipation cue, no state change
    Announce,
    /// Faces drawn, round scored
    Resolve,
    /// Draw shown, same round tossed again
    SettleDraw,
    /// Decisive round shown, next round begins
    SettleRound,
    /// Threshold reached, match closes
    Finish,
}

/// Phase delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Request to announce
    pub announce: Duration,
    /// Request to resolve (not announce to resolve)
    pub resolve: Duration,
    /// Resolve to ready after a draw
    pub draw_settle: Duration,
    /// Resolve to ready after a decisive round
    pub round_settle: Duration,
    /// Resolve to match end when the threshold was reached
    pub finish: Duration,
}

impl PhaseTimings {
    /// Wait before running `phase`, measured from the previous phase
    pub fn delay_before(&self, phase: TossPhase) -> Duration {
        match phase {
            TossPhase::Announce => self.announce,
            TossPhase::Resolve => self.resolve.saturating_sub(self.announce),
            TossPhase::SettleDraw => self.draw_settle,
            TossPhase::SettleRound => self.round_settle,
            TossPhase::Finish => self.finish,
        }
    }

    /// Zero delays, for driving sequences without a clock
    pub fn immediate() -> Self {
        Self {
            announce: Duration::ZERO,
            resolve: Duration::ZERO,
            draw_settle: Duration::ZERO,
            round_settle: Duration::ZERO,
            finish: Duration::ZERO,
        }
    }
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            announce: Duration::from_millis(500),
            resolve: Duration::from_millis(2000),
            draw_settle: Duration::from_millis(1500),
            round_settle: Duration::from_millis(2000),
            finish: Duration::from_millis(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_delay_measured_from_request() {
        let timings = PhaseTimings::default();
        let total = timings.delay_before(TossPhase::Announce)
            + timings.delay_before(TossPhase::Resolve);
        assert_eq!(total, Duration::from_millis(2000));
    }

    #[test]
    fn test_resolve_never_precedes_announce() {
        let timings = PhaseTimings {
            announce: Duration::from_millis(800),
            resolve: Duration::from_millis(300),
            ..PhaseTimings::default()
        };
        assert_eq!(timings.delay_before(TossPhase::Resolve), Duration::ZERO);
    }

    #[test]
    fn test_default_settle_delays() {
        let timings = PhaseTimings::default();
        assert_eq!(timings.delay_before(TossPhase::SettleDraw), Duration::from_millis(1500));
        assert_eq!(timings.delay_before(TossPhase::SettleRound), Duration::from_millis(2000));
        assert_eq!(timings.delay_before(TossPhase::Finish), Duration::from_millis(2000));
    }
}

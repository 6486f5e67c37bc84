//! Read-only match views for rendering

use serde::Serialize;
use uuid::Uuid;

use super::phase::TossPhase;
use super::scoring::{MatchState, MatchStatus, RoundRecord, Scores, StreakState};
use super::setup::{MatchAssets, MatchConfig};

/// History record with its display line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: RoundRecord,
    pub description: String,
}

/// Copy of a match's state at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot {
    pub match_id: Uuid,
    pub p1_name: String,
    pub p2_name: String,
    pub win_threshold: u32,
    pub assets: MatchAssets,
    pub scores: Scores,
    pub round_number: u32,
    pub attempts: u32,
    pub status: MatchStatus,
    pub busy: bool,
    /// Whether a toss request would be accepted right now
    pub ready: bool,
    /// Next scheduled phase of the running toss
    pub pending_phase: Option<TossPhase>,
    pub history: Vec<HistoryEntry>,
    pub scoreboard: String,
    /// Leading score as a fraction of the threshold
    pub progress: f32,
    pub streak: StreakState,
}

impl MatchSnapshot {
    pub fn build(
        match_id: Uuid,
        config: &MatchConfig,
        state: &MatchState,
        pending_phase: Option<TossPhase>,
        streak: StreakState,
    ) -> Self {
        let history = state
            .history
            .iter()
            .map(|record| HistoryEntry {
                description: record.describe(config),
                record: record.clone(),
            })
            .collect();

        let progress = if config.win_threshold == 0 {
            1.0
        } else {
            (state.scores.max() as f32 / config.win_threshold as f32).min(1.0)
        };

        Self {
            match_id,
            p1_name: config.p1_name.clone(),
            p2_name: config.p2_name.clone(),
            win_threshold: config.win_threshold,
            assets: config.assets.clone(),
            scores: state.scores,
            round_number: state.round_number,
            attempts: state.attempts,
            status: state.status,
            busy: state.busy,
            ready: state.accepts_toss(),
            pending_phase,
            history,
            scoreboard: format!(
                "{}: {} | {}: {}",
                config.p1_name, state.scores.p1, config.p2_name, state.scores.p2
            ),
            progress,
            streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::{Face, Player, TossFaces};

    #[test]
    fn test_snapshot_scoreboard_and_progress() {
        let config = MatchConfig::with_names("Alice", "Bob");
        let mut state = MatchState::new();
        state.begin_toss();
        state.award_round(Player::P1, TossFaces::new(Face::Front, Face::Back));
        state.advance_round();
        state.begin_toss();
        state.award_round(Player::P1, TossFaces::new(Face::Front, Face::Back));

        let snapshot = MatchSnapshot::build(
            Uuid::nil(),
            &config,
            &state,
            Some(TossPhase::SettleRound),
            StreakState::default(),
        );

        assert_eq!(snapshot.scoreboard, "Alice: 2 | Bob: 0");
        assert!((snapshot.progress - 0.4).abs() < f32::EPSILON);
        assert_eq!(snapshot.history[1].description, "Round 2: Alice wins!");
        assert!(snapshot.busy);
        assert!(!snapshot.ready);
    }

    #[test]
    fn test_snapshot_serializes_flattened_history() {
        let config = MatchConfig::default();
        let mut state = MatchState::new();
        state.begin_toss();
        state.record_draw(TossFaces::new(Face::Front, Face::Front));

        let snapshot = MatchSnapshot::build(Uuid::nil(), &config, &state, None, StreakState::default());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["history"][0]["round_number"], 1);
        assert_eq!(json["history"][0]["outcome"]["kind"], "draw");
        assert_eq!(json["history"][0]["description"], "Round 1: Draw - retossing");
        assert_eq!(json["status"], "in_progress");
    }

    #[test]
    fn test_ready_follows_toss_acceptance() {
        let config = MatchConfig::default();
        let build = |state: &MatchState| {
            MatchSnapshot::build(Uuid::nil(), &config, state, None, StreakState::default())
        };

        let mut state = MatchState::new();
        assert!(build(&state).ready);

        state.begin_toss();
        assert_eq!(build(&state).ready, state.accepts_toss());
        assert!(!build(&state).ready);

        state.award_round(Player::P2, TossFaces::new(Face::Back, Face::Front));
        state.finish();
        let snapshot = build(&state);
        assert_eq!(snapshot.status, MatchStatus::Finished);
        assert!(!snapshot.busy);
        assert!(!snapshot.ready);
    }
}

//! Match state, scoring and streak bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::{Player, TossFaces, WIN_THRESHOLD};
use super::setup::MatchConfig;

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Set up, no toss requested yet
    Idle,
    /// At least one toss requested
    InProgress,
    /// A player reached the win threshold
    Finished,
}

/// Per-player scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub p1: u32,
    pub p2: u32,
}

impl Scores {
    pub fn get(&self, player: Player) -> u32 {
        match player {
            Player::P1 => self.p1,
            Player::P2 => self.p2,
        }
    }

    fn increment(&mut self, player: Player) {
        match player {
            Player::P1 => self.p1 += 1,
            Player::P2 => self.p2 += 1,
        }
    }

    /// Player with the strictly higher score
    pub fn leader(&self) -> Option<Player> {
        match self.p1.cmp(&self.p2) {
            std::cmp::Ordering::Greater => Some(Player::P1),
            std::cmp::Ordering::Less => Some(Player::P2),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn max(&self) -> u32 {
        self.p1.max(self.p2)
    }

    pub fn total(&self) -> u32 {
        self.p1 + self.p2
    }
}

/// Outcome stored in the round history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "player", rename_all = "snake_case")]
pub enum RoundOutcome {
    Win(Player),
    Draw,
}

/// One toss attempt in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: u32,
    pub outcome: RoundOutcome,
    pub faces: TossFaces,
    pub timestamp: DateTime<Utc>,
}

impl RoundRecord {
    /// History line as shown to players
    pub fn describe(&self, config: &MatchConfig) -> String {
        match self.outcome {
            RoundOutcome::Win(player) => {
                format!("Round {}: {} wins!", self.round_number, config.name(player))
            }
            RoundOutcome::Draw => format!("Round {}: Draw - retossing", self.round_number),
        }
    }
}

/// Mutable state of a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub scores: Scores,
    pub round_number: u32,
    /// Accepted toss requests, draws included
    pub attempts: u32,
    pub history: Vec<RoundRecord>,
    pub status: MatchStatus,
    pub busy: bool,
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            scores: Scores::default(),
            round_number: 1,
            attempts: 0,
            history: Vec::new(),
            status: MatchStatus::Idle,
            busy: false,
        }
    }

    /// Whether a toss request would be accepted right now
    pub fn accepts_toss(&self) -> bool {
        !self.busy && self.status != MatchStatus::Finished
    }

    /// Claim the match for a new toss sequence.
    ///
    /// Returns false (and changes nothing) while another toss is running or
    /// after the match finished.
    pub fn begin_toss(&mut self) -> bool {
        if !self.accepts_toss() {
            return false;
        }
        if self.status == MatchStatus::Idle {
            self.status = MatchStatus::InProgress;
        }
        self.busy = true;
        self.attempts += 1;
        true
    }

    /// Credit a decisive round to `player`
    pub fn award_round(&mut self, player: Player, faces: TossFaces) -> &RoundRecord {
        self.scores.increment(player);
        self.push_record(RoundOutcome::Win(player), faces)
    }

    /// Log a draw under the current round number
    pub fn record_draw(&mut self, faces: TossFaces) -> &RoundRecord {
        self.push_record(RoundOutcome::Draw, faces)
    }

    fn push_record(&mut self, outcome: RoundOutcome, faces: TossFaces) -> &RoundRecord {
        self.history.push(RoundRecord {
            round_number: self.round_number,
            outcome,
            faces,
            timestamp: Utc::now(),
        });
        &self.history[self.history.len() - 1]
    }

    /// Player whose score reached the threshold, if any
    pub fn threshold_winner(&self) -> Option<Player> {
        Player::ALL
            .into_iter()
            .find(|p| self.scores.get(*p) >= WIN_THRESHOLD)
    }

    /// Settle a decisive round that did not end the match
    pub fn advance_round(&mut self) {
        self.round_number += 1;
        self.busy = false;
    }

    /// Settle a draw; the same round is tossed again
    pub fn settle_draw(&mut self) {
        self.busy = false;
    }

    pub fn finish(&mut self) {
        self.status = MatchStatus::Finished;
        self.busy = false;
    }

    pub fn decisive_rounds(&self) -> usize {
        self.history
            .iter()
            .filter(|r| matches!(r.outcome, RoundOutcome::Win(_)))
            .count()
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Consecutive decisive wins by the same player name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub holder: Option<String>,
    pub count: u32,
}

impl StreakState {
    /// Record a decisive round won by `winner`
    pub fn update(&mut self, winner: &str) {
        if self.holder.as_deref() == Some(winner) {
            self.count += 1;
        } else {
            self.holder = Some(winner.to_string());
            self.count = 1;
        }
    }
}

/// Long-run results across matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_matches: u64,
    pub p1_total_wins: u64,
    pub p2_total_wins: u64,
}

/// Final result of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub winner: Option<Player>,
    pub scores: Scores,
    pub message: String,
}

/// Decide the winner, bump the aggregate counters and compose the summary line
pub fn finalize_match(
    state: &MatchState,
    config: &MatchConfig,
    stats: &mut AggregateStats,
) -> MatchSummary {
    let winner = state.scores.leader();
    let message = match winner {
        Some(player) => {
            match player {
                Player::P1 => stats.p1_total_wins += 1,
                Player::P2 => stats.p2_total_wins += 1,
            }
            format!(
                "{} wins with {} points!",
                config.name(player),
                state.scores.get(player)
            )
        }
        None => format!(
            "It's a tie! Both players scored {} points!",
            state.scores.p1
        ),
    };
    stats.total_matches += 1;

    MatchSummary {
        winner,
        scores: state.scores,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::{classify, Face, TossOutcome};
    use proptest::prelude::*;

    const P1_WINS: TossFaces = TossFaces {
        p1: Face::Front,
        p2: Face::Back,
    };
    const P2_WINS: TossFaces = TossFaces {
        p1: Face::Back,
        p2: Face::Front,
    };
    const DRAW: TossFaces = TossFaces {
        p1: Face::Back,
        p2: Face::Back,
    };

    fn config() -> MatchConfig {
        MatchConfig::with_names("Alice", "Bob")
    }

    /// Drive a state through the same steps the sequencer takes
    fn play(state: &mut MatchState, faces: TossFaces) {
        assert!(state.begin_toss());
        match classify(faces) {
            TossOutcome::Draw => {
                state.record_draw(faces);
                state.settle_draw();
            }
            TossOutcome::Win(player) => {
                state.award_round(player, faces);
                if state.threshold_winner().is_some() {
                    state.finish();
                } else {
                    state.advance_round();
                }
            }
        }
    }

    #[test]
    fn test_begin_toss_guards_busy_and_finished() {
        let mut state = MatchState::new();
        assert_eq!(state.status, MatchStatus::Idle);

        assert!(state.begin_toss());
        assert_eq!(state.status, MatchStatus::InProgress);
        assert!(!state.begin_toss());
        assert_eq!(state.attempts, 1);

        state.finish();
        assert!(!state.begin_toss());
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn test_award_round_records_current_round() {
        let mut state = MatchState::new();
        state.begin_toss();
        let record = state.award_round(Player::P2, P2_WINS).clone();

        assert_eq!(record.round_number, 1);
        assert_eq!(record.outcome, RoundOutcome::Win(Player::P2));
        assert_eq!(state.scores, Scores { p1: 0, p2: 1 });
    }

    #[test]
    fn test_draw_keeps_round_number() {
        let mut state = MatchState::new();
        play(&mut state, P1_WINS);
        play(&mut state, P1_WINS);
        play(&mut state, DRAW);
        assert_eq!(state.round_number, 3);
        play(&mut state, P2_WINS);

        let rounds: Vec<u32> = state.history.iter().map(|r| r.round_number).collect();
        assert_eq!(rounds, vec![1, 2, 3, 3]);
        assert_eq!(state.history[2].outcome, RoundOutcome::Draw);
        assert_eq!(state.round_number, 4);
    }

    #[test]
    fn test_describe_history_lines() {
        let mut state = MatchState::new();
        play(&mut state, P1_WINS);
        play(&mut state, DRAW);

        let config = config();
        assert_eq!(state.history[0].describe(&config), "Round 1: Alice wins!");
        assert_eq!(state.history[1].describe(&config), "Round 2: Draw - retossing");
    }

    #[test]
    fn test_streak_same_winner_extends() {
        let mut streak = StreakState::default();
        streak.update("Alice");
        streak.update("Alice");
        assert_eq!(streak.holder.as_deref(), Some("Alice"));
        assert_eq!(streak.count, 2);

        streak.update("Bob");
        assert_eq!(streak.holder.as_deref(), Some("Bob"));
        assert_eq!(streak.count, 1);
    }

    #[test]
    fn test_finalize_counts_winner() {
        let mut state = MatchState::new();
        for _ in 0..5 {
            play(&mut state, P1_WINS);
        }
        assert_eq!(state.status, MatchStatus::Finished);

        let mut stats = AggregateStats::default();
        let summary = finalize_match(&state, &config(), &mut stats);

        assert_eq!(summary.winner, Some(Player::P1));
        assert_eq!(summary.message, "Alice wins with 5 points!");
        assert_eq!(
            stats,
            AggregateStats {
                total_matches: 1,
                p1_total_wins: 1,
                p2_total_wins: 0,
            }
        );
    }

    #[test]
    fn test_finalize_tie_message() {
        let state = MatchState::new();
        let mut stats = AggregateStats::default();
        let summary = finalize_match(&state, &config(), &mut stats);

        assert_eq!(summary.winner, None);
        assert_eq!(summary.message, "It's a tie! Both players scored 0 points!");
        assert_eq!(stats.total_matches, 1);
        assert_eq!(stats.p1_total_wins + stats.p2_total_wins, 0);
    }

    fn faces_strategy() -> impl Strategy<Value = TossFaces> {
        prop_oneof![Just(P1_WINS), Just(P2_WINS), Just(DRAW)]
    }

    proptest! {
        #[test]
        fn prop_bookkeeping_invariants(tosses in prop::collection::vec(faces_strategy(), 0..64)) {
            let mut state = MatchState::new();
            let mut previous = state.scores;

            for faces in tosses {
                if state.status == MatchStatus::Finished {
                    prop_assert!(!state.begin_toss());
                    break;
                }
                play(&mut state, faces);

                prop_assert!(state.scores.p1 >= previous.p1);
                prop_assert!(state.scores.p2 >= previous.p2);
                prop_assert!(state.scores.total() - previous.total() <= 1);
                previous = state.scores;

                prop_assert_eq!(state.history.len() as u32, state.attempts);
                prop_assert_eq!(state.scores.total() as usize, state.decisive_rounds());
                prop_assert!(state.scores.max() <= WIN_THRESHOLD);
                prop_assert_eq!(
                    state.status == MatchStatus::Finished,
                    state.scores.max() == WIN_THRESHOLD
                );
            }
        }

        #[test]
        fn prop_round_number_tracks_decisive_rounds(tosses in prop::collection::vec(faces_strategy(), 0..64)) {
            let mut state = MatchState::new();
            for faces in tosses {
                if !state.accepts_toss() {
                    break;
                }
                play(&mut state, faces);
            }
            let decisive = state.decisive_rounds() as u32;
            let expected = if state.status == MatchStatus::Finished {
                decisive
            } else {
                decisive + 1
            };
            prop_assert_eq!(state.round_number, expected);
        }
    }
}

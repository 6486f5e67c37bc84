//! Round events emitted to presentation layers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rules::{Face, Player, TossFaces};
use super::scoring::{Scores, StreakState};

/// Events of a toss sequence, in emission order:
/// `toss_announced`, then `round_drawn` or `round_resolved`, then
/// `match_ended` or `toss_ready`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    /// Start the anticipation animation
    TossAnnounced {
        match_id: Uuid,
        attempt: u32,
        round_number: u32,
    },

    /// Same faces, the round is tossed again
    RoundDrawn {
        match_id: Uuid,
        round_number: u32,
        faces: TossFaces,
    },

    /// A player took the round
    RoundResolved {
        match_id: Uuid,
        round_number: u32,
        winner: Player,
        winner_name: String,
        winner_face: Face,
        loser_face: Face,
        scores: Scores,
        streak: StreakState,
    },

    /// A player reached the win threshold
    MatchEnded {
        match_id: Uuid,
        winner: Option<Player>,
        winner_name: Option<String>,
        scores: Scores,
        summary: String,
    },

    /// The engine accepts the next toss
    TossReady { match_id: Uuid, round_number: u32 },

    /// Match cleared back to idle; pending phases were dropped
    MatchReset { match_id: Uuid },

    /// Match was removed; no further events follow
    MatchClosed { match_id: Uuid },
}

impl RoundEvent {
    pub fn match_id(&self) -> Uuid {
        match self {
            RoundEvent::TossAnnounced { match_id, .. }
            | RoundEvent::RoundDrawn { match_id, .. }
            | RoundEvent::RoundResolved { match_id, .. }
            | RoundEvent::MatchEnded { match_id, .. }
            | RoundEvent::TossReady { match_id, .. }
            | RoundEvent::MatchReset { match_id }
            | RoundEvent::MatchClosed { match_id } => *match_id,
        }
    }

    /// Build the resolved event for a decisive toss
    pub(crate) fn resolved(
        match_id: Uuid,
        round_number: u32,
        winner: Player,
        winner_name: &str,
        faces: TossFaces,
        scores: Scores,
        streak: StreakState,
    ) -> Self {
        RoundEvent::RoundResolved {
            match_id,
            round_number,
            winner,
            winner_name: winner_name.to_string(),
            winner_face: faces.of(winner),
            loser_face: faces.of(winner.other()),
            scores,
            streak,
        }
    }
}

//! Toss rules: faces, players and round classification

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score a player must reach to win the match
pub const WIN_THRESHOLD: u32 = 5;

/// The face that wins a decisive round
pub const WINNING_FACE: Face = Face::Front;

/// Player seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    P1,
    P2,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::P1, Player::P2];

    pub fn other(self) -> Self {
        match self {
            Player::P1 => Player::P2,
            Player::P2 => Player::P1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::P1 => write!(f, "P1"),
            Player::P2 => write!(f, "P2"),
        }
    }
}

/// Side a tossed card lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    Front,
    Back,
}

/// Faces drawn for both players in one toss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TossFaces {
    pub p1: Face,
    pub p2: Face,
}

impl TossFaces {
    pub fn new(p1: Face, p2: Face) -> Self {
        Self { p1, p2 }
    }

    pub fn of(&self, player: Player) -> Face {
        match player {
            Player::P1 => self.p1,
            Player::P2 => self.p2,
        }
    }
}

/// Result of classifying a toss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TossOutcome {
    Draw,
    Win(Player),
}

/// Same faces draw; otherwise whoever holds the winning face takes the round.
pub fn classify(faces: TossFaces) -> TossOutcome {
    if faces.p1 == faces.p2 {
        TossOutcome::Draw
    } else if faces.p1 == WINNING_FACE {
        TossOutcome::Win(Player::P1)
    } else {
        TossOutcome::Win(Player::P2)
    }
}

/// Source of card faces for the resolve phase
pub trait FaceSource: Send + 'static {
    /// Draw a single face
    fn draw(&mut self) -> Face;

    /// Draw one face per player, each independently
    fn draw_pair(&mut self) -> TossFaces {
        let p1 = self.draw();
        let p2 = self.draw();
        TossFaces { p1, p2 }
    }
}

/// Uniform, independent faces from a ChaCha stream
pub struct RandomFaces {
    rng: ChaCha8Rng,
}

impl RandomFaces {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(rand::random::<u64>()),
        }
    }
}

impl FaceSource for RandomFaces {
    fn draw(&mut self) -> Face {
        if self.rng.gen_bool(0.5) {
            Face::Front
        } else {
            Face::Back
        }
    }
}

/// Replays a fixed list of faces, cycling when exhausted.
///
/// Faces are consumed in draw order, so a toss takes `p1` then `p2`.
pub struct ScriptedFaces {
    faces: Vec<Face>,
    cursor: usize,
}

impl ScriptedFaces {
    pub fn new(tosses: impl IntoIterator<Item = TossFaces>) -> Self {
        let faces: Vec<Face> = tosses.into_iter().flat_map(|t| [t.p1, t.p2]).collect();
        Self { faces, cursor: 0 }
    }

    /// Every toss lands the same way
    pub fn repeating(toss: TossFaces) -> Self {
        Self::new([toss])
    }
}

impl FaceSource for ScriptedFaces {
    fn draw(&mut self) -> Face {
        if self.faces.is_empty() {
            return Face::Back;
        }
        let face = self.faces[self.cursor % self.faces.len()];
        self.cursor += 1;
        face
    }
}

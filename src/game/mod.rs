//! Match engine: toss rules, bookkeeping and the timed toss sequence

pub mod events;
pub mod r#match;
pub mod phase;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod setup;
pub mod snapshot;

pub use events::RoundEvent;
pub use phase::{PhaseTimings, TossPhase};
pub use r#match::{MatchHandle, MatchRegistry, TossEngine};
pub use rules::{Face, FaceSource, Player, RandomFaces, ScriptedFaces, TossFaces, WIN_THRESHOLD};
pub use scoring::{AggregateStats, MatchState, MatchStatus, RoundOutcome, RoundRecord, Scores, StreakState};
pub use session::{SessionSnapshot, SessionStats};
pub use setup::{ImageRef, ImageResolver, ImageSlot, MatchConfig, MatchSetup, SetupWarning};
pub use snapshot::MatchSnapshot;

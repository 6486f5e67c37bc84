//! Card Toss - two-player card toss match engine and event server
//!
//! The `game` module holds the engine: toss rules, scoring bookkeeping and
//! the timed phase sequence behind each toss. `http` and `ws` expose matches
//! to a presentation client.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

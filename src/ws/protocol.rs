//! WebSocket protocol message definitions
//! These are the wire types between the server and a presentation client

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{MatchSnapshot, RoundEvent};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request a toss (ignored while one is running)
    Toss,

    /// Return the match to idle
    Reset,

    /// Ask for a fresh snapshot
    Snapshot,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        match_id: Uuid,
        server_time: u64,
    },

    /// Full match state
    Snapshot {
        snapshot: MatchSnapshot,
    },

    /// Phase event of the running toss; fields are inlined next to `type`
    Round(RoundEvent),

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

// Core data structures for tracked game servers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// The epoch value stored in `expire` to mark a record as immediately due
pub const EPOCH: Timestamp = 0;

/// Game mode of a tracked server
///
/// Only CTF games are ranked today. The mode is not part of the on-disk
/// grammar; every decoded record is restored as [`GameType::Ctf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameType {
    #[default]
    #[serde(rename = "CTF")]
    Ctf,
}

impl GameType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ctf => "CTF",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player connected to a server at the time of the last poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub name: String,
    pub clan: String,
    pub score: i64,
}

impl ClientRecord {
    pub fn new(name: impl Into<String>, clan: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            clan: clan.into(),
            score,
        }
    }
}

/// Persisted state of one tracked server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Last successful poll, or creation time if never seen online
    pub last_seen: Timestamp,

    /// Re-poll due date
    pub expire: Timestamp,

    pub game_type: GameType,

    pub clients: Vec<ClientRecord>,
}

impl ServerRecord {
    /// Fresh record for a newly observed server: no clients, immediately due
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_seen: now,
            expire: EPOCH,
            game_type: GameType::default(),
            clients: Vec::new(),
        }
    }

    /// Number of clients seen on the last successful poll
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }
}

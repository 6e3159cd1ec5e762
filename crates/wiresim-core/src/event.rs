//! Synthetic records carried by the simulated connection.

use std::fmt;

use crate::error::ConfigError;

/// Semantic category of a synthetic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Chat-style message
    Message,
    /// Notification or broadcast
    Event,
    /// State synchronisation
    State,
}

impl EventKind {
    /// Every kind; generators pick uniformly from this.
    pub const ALL: [Self; 3] = [Self::Message, Self::Event, Self::State];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Event => "event",
            Self::State => "state",
        })
    }
}

/// Which endpoint is modelled as the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server push
    ToClient,
    /// Client upload
    ToServer,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToClient => "server -> client",
            Self::ToServer => "client -> server",
        })
    }
}

/// One synthetic datum. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord<I> {
    /// Strictly increasing within a stream
    pub id: u64,
    /// Semantic category
    pub kind: EventKind,
    /// Modelled sender
    pub direction: Direction,
    /// Human-readable description from the payload pool
    pub payload: String,
    /// Simulated actor; only set on feed-style streams
    pub origin_user: Option<String>,
    /// Generation time
    pub timestamp: I,
}

/// Fixed pools that payloads and actors are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPool {
    /// Payload descriptions
    pub payloads: Vec<String>,
    /// Actor names
    pub users: Vec<String>,
}

const DEFAULT_PAYLOADS: [&str; 8] = [
    "New user online",
    "Document updated",
    "Push notification received",
    "Sync completed",
    "Live edit",
    "Session state updated",
    "Broadcast event received",
    "User presence detected",
];

const DEFAULT_USERS: [&str; 5] = ["Marco", "Giulia", "Alessandro", "Sofia", "Andrea"];

impl Default for ContentPool {
    fn default() -> Self {
        Self {
            payloads: DEFAULT_PAYLOADS.iter().map(ToString::to_string).collect(),
            users: DEFAULT_USERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ContentPool {
    /// Reject pools that generators could not draw from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payloads.is_empty() {
            return Err(ConfigError::EmptyPool("payloads"));
        }
        if self.users.is_empty() {
            return Err(ConfigError::EmptyPool("users"));
        }
        Ok(())
    }
}

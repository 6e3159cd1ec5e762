//! Error types for the simulator core.
//!
//! The lifecycle itself has a single failure: pausing a connection that is
//! not active. Simulated network errors are successful transitions, not
//! errors. Configuration and text-command parsing get their own types so
//! callers can tell a bad setup from a bad keystroke.

use std::time::Duration;

use thiserror::Error;

use crate::connection::{Command, ConnectionState};

/// Errors that can occur when issuing commands to the state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// Command requires a state the connection is not in
    #[error("precondition failed: cannot {command} while {state}")]
    Precondition {
        /// Current state when the command was issued
        state: ConnectionState,
        /// Command that was rejected
        command: Command,
    },
}

impl ConnectionError {
    /// Returns true if the command may succeed when retried later.
    ///
    /// A rejected pause is informational: it succeeds once the connection
    /// is back in [`ConnectionState::Connected`].
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

/// Invalid simulator configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Buffer capacity of zero can never hold a record
    #[error("{stream}: capacity must be non-zero")]
    ZeroCapacity {
        /// Stream the setting belongs to
        stream: &'static str,
    },

    /// Repeating timer with a zero period
    #[error("{stream}: cadence must be non-zero, got {cadence:?}")]
    ZeroCadence {
        /// Stream the setting belongs to
        stream: &'static str,
        /// Offending cadence
        cadence: Duration,
    },

    /// Probability outside `[0, 1]`
    #[error("{stream}: to-client ratio must be within [0, 1], got {ratio}")]
    InvalidRatio {
        /// Stream the setting belongs to
        stream: &'static str,
        /// Offending ratio
        ratio: f64,
    },

    /// Recovery delays that overflow when added together
    #[error("recovery delays overflow: {error_delay:?} + {recovery_delay:?}")]
    DelayOverflow {
        /// Time spent disconnected
        error_delay: Duration,
        /// Time spent reconnecting
        recovery_delay: Duration,
    },

    /// Content pool with nothing to draw from
    #[error("content pool has no {0}")]
    EmptyPool(&'static str),
}

/// Text that does not name a known command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown command: {input:?}")]
pub struct ParseCommandError {
    /// The unrecognised input, trimmed
    pub input: String,
}

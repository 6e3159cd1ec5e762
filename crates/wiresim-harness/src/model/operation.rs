//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a session. They are
//! generated randomly (by proptest or a fuzzer) and applied to both the model
//! and the real simulator.

use arbitrary::Arbitrary;
use wiresim_core::{Command, ConnectionError, PollingMode};

/// Operations that can be applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Open the connection.
    Connect,
    /// Close the connection.
    Disconnect,
    /// Flip the pause flag.
    TogglePause,
    /// Start the error-recovery sequence.
    SimulateError,
    /// Advance simulation time.
    ///
    /// Delivers every timer that falls due in the window.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
    /// Switch the polling comparison.
    SetPollingMode(ModelPollingMode),
}

impl Operation {
    /// The user command this operation issues, if any.
    pub fn command(self) -> Option<Command> {
        match self {
            Self::Connect => Some(Command::Connect),
            Self::Disconnect => Some(Command::Disconnect),
            Self::TogglePause => Some(Command::TogglePause),
            Self::SimulateError => Some(Command::SimulateError),
            Self::AdvanceTime { .. } | Self::SetPollingMode(_) => None,
        }
    }
}

/// Polling technique, mirrored for `Arbitrary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelPollingMode {
    /// Fixed-period requests.
    Polling,
    /// Held requests.
    LongPolling,
    /// Persistent connection.
    Realtime,
}

impl From<ModelPollingMode> for PollingMode {
    fn from(mode: ModelPollingMode) -> Self {
        match mode {
            ModelPollingMode::Polling => Self::Polling,
            ModelPollingMode::LongPolling => Self::LongPolling,
            ModelPollingMode::Realtime => Self::Realtime,
        }
    }
}

/// Error from applying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Pause toggled while not `Connected`.
    NotConnected,
}

impl From<ConnectionError> for OperationError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Precondition { .. } => Self::NotConnected,
        }
    }
}

/// Result of applying an operation.
pub type OperationResult = Result<(), OperationError>;

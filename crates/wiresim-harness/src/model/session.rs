//! Model session - the reference implementation.
//!
//! A deliberately naive restatement of the connection lifecycle: plain
//! fields, explicit deadlines, no scheduler. The real simulator must agree
//! with it after every operation.

use std::time::Duration;

use wiresim_core::{ConnectionConfig, ConnectionState, ConnectionStatus, PollingMode};

use super::operation::{Operation, OperationError, OperationResult};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservableState {
    /// Connection `(state, paused)`.
    pub status: ConnectionStatus,
    /// Active polling technique.
    pub polling_mode: PollingMode,
    /// Whether a recovery sequence is still in flight.
    pub recovering: bool,
}

/// Deadlines of the recovery sequence in flight, in model milliseconds.
#[derive(Debug, Clone, Copy)]
struct Recovery {
    reconnecting_at: Option<u64>,
    connected_at: u64,
}

/// Reference model of one simulator session.
#[derive(Debug, Clone)]
pub struct ModelSession {
    now: u64,
    state: ConnectionState,
    paused: bool,
    polling_mode: PollingMode,
    recovery: Option<Recovery>,
    error_delay: u64,
    recovery_delay: u64,
}

impl Default for ModelSession {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl ModelSession {
    /// Fresh session: `Connected`, unpaused, default polling mode.
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            now: 0,
            state: ConnectionState::Connected,
            paused: false,
            polling_mode: PollingMode::default(),
            recovery: None,
            error_delay: millis(config.error_delay),
            recovery_delay: millis(config.recovery_delay),
        }
    }

    /// Model time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Connect => {
                self.recovery = None;
                self.state = ConnectionState::Connected;
                self.paused = false;
            },
            Operation::Disconnect => {
                self.recovery = None;
                self.state = ConnectionState::Disconnected;
            },
            Operation::TogglePause => {
                if self.state != ConnectionState::Connected {
                    return Err(OperationError::NotConnected);
                }
                self.paused = !self.paused;
            },
            Operation::SimulateError => {
                self.state = ConnectionState::Disconnected;
                self.recovery = Some(Recovery {
                    reconnecting_at: Some(self.now + self.error_delay),
                    connected_at: self.now + self.error_delay + self.recovery_delay,
                });
            },
            Operation::AdvanceTime { millis } => self.advance(u64::from(millis)),
            Operation::SetPollingMode(mode) => self.polling_mode = mode.into(),
        }
        Ok(())
    }

    fn advance(&mut self, by: u64) {
        let target = self.now + by;

        if let Some(recovery) = &mut self.recovery {
            if recovery.reconnecting_at.is_some_and(|at| at <= target) {
                recovery.reconnecting_at = None;
                self.state = ConnectionState::Reconnecting;
            }
            if recovery.connected_at <= target {
                self.recovery = None;
                self.state = ConnectionState::Connected;
            }
        }

        self.now = target;
    }

    /// Current observable state.
    pub fn observable(&self) -> ObservableState {
        ObservableState {
            status: ConnectionStatus { state: self.state, paused: self.paused },
            polling_mode: self.polling_mode,
            recovering: self.recovery.is_some(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

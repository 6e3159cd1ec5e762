//! Connection lifecycle state machine.
//!
//! Models a persistent connection that the user can connect, disconnect,
//! pause, or knock over with a simulated network error. Uses the action
//! pattern: commands go in, actions come out, and the caller (the simulator)
//! executes them against its scheduler. The machine never touches a clock.
//!
//! # State Machine
//!
//! ```text
//!                  connect (clears pause)
//!        ┌──────────────────────────────────────────┐
//!        ↓                                          │
//! ┌───────────┐  disconnect   ┌──────────────┐      │
//! │ Connected │──────────────>│ Disconnected │──────┘
//! └───────────┘ simulate_err  └──────────────┘
//!   ↑  │ toggle_pause                │ after D1
//!   │  └─┐                           ↓
//!   │    ↓                    ┌──────────────┐
//!   │  (paused flips)         │ Reconnecting │
//!   │                         └──────────────┘
//!   │          after D1 + D2         │
//!   └────────────────────────────────┘
//! ```
//!
//! `connect`, `disconnect` and `simulate_error` are accepted from every
//! state. Any of them cancels a recovery sequence that is still pending.

use std::{fmt, str::FromStr, time::Duration};

use crate::error::{ConfigError, ConnectionError, ParseCommandError};

/// Delay between a simulated error and the start of reconnection.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_millis(1000);

/// Additional delay between reconnecting and being connected again.
pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_millis(2000);

/// Lifecycle state of the simulated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Connection open, traffic may flow
    Connected,
    /// Connection closed, nothing flows
    Disconnected,
    /// Recovering from a simulated error
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
        })
    }
}

/// Observable `(state, paused)` pair.
///
/// `paused` is only meaningful while [`ConnectionState::Connected`]; it is
/// kept, not cleared, across the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionStatus {
    /// Current lifecycle state
    pub state: ConnectionState,
    /// Whether emission is suspended
    pub paused: bool,
}

impl ConnectionStatus {
    /// True when records should be emitted: connected and not paused.
    pub fn is_streaming(&self) -> bool {
        self.state == ConnectionState::Connected && !self.paused
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state == ConnectionState::Connected && self.paused {
            write!(f, "{} (paused)", self.state)
        } else {
            write!(f, "{}", self.state)
        }
    }
}

/// User-issued commands. The set is closed: every command is always
/// accepted except [`Command::TogglePause`] outside `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open the connection and clear the pause flag
    Connect,
    /// Close the connection
    Disconnect,
    /// Flip the pause flag of an open connection
    TogglePause,
    /// Drop the connection and recover automatically
    SimulateError,
}

impl Command {
    /// Every command, in display order.
    pub const ALL: [Self; 4] =
        [Self::Connect, Self::Disconnect, Self::TogglePause, Self::SimulateError];
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::TogglePause => "toggle-pause",
            Self::SimulateError => "simulate-error",
        })
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        match input.to_ascii_lowercase().as_str() {
            "connect" | "c" => Ok(Self::Connect),
            "disconnect" | "d" => Ok(Self::Disconnect),
            "toggle-pause" | "pause" | "resume" | "p" => Ok(Self::TogglePause),
            "simulate-error" | "error" | "e" => Ok(Self::SimulateError),
            _ => Err(ParseCommandError { input: input.to_string() }),
        }
    }
}

/// Step of the recovery sequence started by [`Command::SimulateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryPhase {
    /// `Disconnected` → `Reconnecting`, after the error delay
    Reconnecting,
    /// `Reconnecting` → `Connected`, after the recovery delay
    Connected,
}

impl RecoveryPhase {
    fn target(self) -> ConnectionState {
        match self {
            Self::Reconnecting => ConnectionState::Reconnecting,
            Self::Connected => ConnectionState::Connected,
        }
    }
}

/// Actions returned by the state machine.
///
/// The simulator executes these in order:
/// - `CancelScheduled`: cancel every pending recovery timer
/// - `ScheduleRecovery`: arm a one-shot timer that feeds `phase` back via
///   [`ConnectionStateMachine::handle_recovery`]
/// - `Notify`: the status changed; tell subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Cancel all pending recovery timers
    CancelScheduled,

    /// Schedule a recovery phase
    ScheduleRecovery {
        /// Delay from now
        delay: Duration,
        /// Phase to apply when the timer fires
        phase: RecoveryPhase,
        /// Sequence the phase belongs to
        epoch: u64,
    },

    /// Committed status change
    Notify(ConnectionStatus),
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Time spent `Disconnected` after a simulated error
    pub error_delay: Duration,
    /// Time spent `Reconnecting` before the connection is restored
    pub recovery_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { error_delay: DEFAULT_ERROR_DELAY, recovery_delay: DEFAULT_RECOVERY_DELAY }
    }
}

impl ConnectionConfig {
    /// Reject delays whose sum, the deadline of the final recovery phase,
    /// cannot be represented.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_delay.checked_add(self.recovery_delay).is_none() {
            return Err(ConfigError::DelayOverflow {
                error_delay: self.error_delay,
                recovery_delay: self.recovery_delay,
            });
        }
        Ok(())
    }
}

/// Connection lifecycle state machine.
///
/// Single source of truth for `(state, paused)`. This is a pure state
/// machine: no timers, no clock. Delayed transitions are returned as
/// [`ConnectionAction::ScheduleRecovery`] and come back through
/// [`Self::handle_recovery`].
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    paused: bool,
    config: ConnectionConfig,
    /// Bumped by every accepted command; recovery phases from an older
    /// epoch are ignored.
    epoch: u64,
    /// Epoch of the recovery sequence still in flight, if any.
    pending_recovery: Option<u64>,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

impl ConnectionStateMachine {
    /// Create a state machine in `(Connected, unpaused)`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Connected,
            paused: false,
            config,
            epoch: 0,
            pending_recovery: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether emission is paused. Only meaningful while connected.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Read-only `(state, paused)` snapshot.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus { state: self.state, paused: self.paused }
    }

    /// True while a simulated-error sequence has phases left to apply.
    pub fn has_pending_recovery(&self) -> bool {
        self.pending_recovery.is_some()
    }

    /// Apply a command.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Precondition` for `TogglePause` outside
    ///   `Connected`. State is left untouched.
    pub fn handle_command(
        &mut self,
        command: Command,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        match command {
            Command::Connect => Ok(self.connect()),
            Command::Disconnect => Ok(self.disconnect()),
            Command::TogglePause => self.toggle_pause(),
            Command::SimulateError => Ok(self.simulate_error()),
        }
    }

    /// Open the connection and clear the pause flag.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        let mut actions = self.preempt();
        self.commit(ConnectionState::Connected, false, &mut actions);
        actions
    }

    /// Close the connection.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let mut actions = self.preempt();
        self.commit(ConnectionState::Disconnected, self.paused, &mut actions);
        actions
    }

    /// Flip the pause flag.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Precondition` if not `Connected`
    pub fn toggle_pause(&mut self) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Connected {
            return Err(ConnectionError::Precondition {
                state: self.state,
                command: Command::TogglePause,
            });
        }

        debug_assert!(self.pending_recovery.is_none());

        let mut actions = Vec::with_capacity(1);
        self.commit(ConnectionState::Connected, !self.paused, &mut actions);
        Ok(actions)
    }

    /// Drop to `Disconnected` and schedule the two recovery phases.
    ///
    /// Both timers are armed relative to now, at `error_delay` and
    /// `error_delay + recovery_delay`, so they fire in order.
    pub fn simulate_error(&mut self) -> Vec<ConnectionAction> {
        let mut actions = self.preempt();
        self.commit(ConnectionState::Disconnected, self.paused, &mut actions);

        let epoch = self.epoch;
        self.pending_recovery = Some(epoch);

        let first = self.config.error_delay;
        let second = first.saturating_add(self.config.recovery_delay);
        actions.push(ConnectionAction::ScheduleRecovery {
            delay: first,
            phase: RecoveryPhase::Reconnecting,
            epoch,
        });
        actions.push(ConnectionAction::ScheduleRecovery {
            delay: second,
            phase: RecoveryPhase::Connected,
            epoch,
        });

        tracing::debug!(epoch, ?first, ?second, "recovery sequence scheduled");
        actions
    }

    /// Apply a recovery phase delivered by a fired timer.
    ///
    /// Phases from a superseded epoch are ignored. The pause flag is kept.
    pub fn handle_recovery(&mut self, phase: RecoveryPhase, epoch: u64) -> Vec<ConnectionAction> {
        if self.pending_recovery != Some(epoch) {
            tracing::trace!(?phase, epoch, current = self.epoch, "stale recovery phase ignored");
            return Vec::new();
        }

        if phase == RecoveryPhase::Connected {
            self.pending_recovery = None;
        }

        let mut actions = Vec::with_capacity(1);
        self.commit(phase.target(), self.paused, &mut actions);
        actions
    }

    /// Start a new epoch, cancelling any recovery still in flight.
    fn preempt(&mut self) -> Vec<ConnectionAction> {
        self.epoch += 1;

        match self.pending_recovery.take() {
            Some(stale) => {
                tracing::debug!(stale, "pending recovery cancelled");
                vec![ConnectionAction::CancelScheduled]
            },
            None => Vec::new(),
        }
    }

    fn commit(&mut self, state: ConnectionState, paused: bool, actions: &mut Vec<ConnectionAction>) {
        let before = self.status();
        self.state = state;
        self.paused = paused;
        let after = self.status();

        if before != after {
            tracing::debug!(from = %before, to = %after, "connection status changed");
            actions.push(ConnectionAction::Notify(after));
        }
    }
}

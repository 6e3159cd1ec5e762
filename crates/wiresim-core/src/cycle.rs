//! Classic request/response cycle, the baseline next to the polling stream.
//!
//! A plain HTTP exchange walks through four steps on a fixed period: the
//! client sends, the server works, the server answers, the client waits.
//! Only the send and answer steps put bytes on the wire.

use std::{fmt, time::Duration};

use crate::event::Direction;

/// Time spent on each step of the cycle.
pub const REQUEST_STEP_CADENCE: Duration = Duration::from_millis(1500);

/// One step of a request/response exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestStep {
    /// Client sends the request
    #[default]
    ClientSends,
    /// Server is processing
    ServerProcesses,
    /// Server sends the response
    ServerResponds,
    /// Client idles until the next request
    ClientWaits,
}

impl RequestStep {
    /// Every step, in cycle order.
    pub const ALL: [Self; 4] =
        [Self::ClientSends, Self::ServerProcesses, Self::ServerResponds, Self::ClientWaits];

    /// Step that follows this one, wrapping back to `ClientSends`.
    pub fn next(self) -> Self {
        match self {
            Self::ClientSends => Self::ServerProcesses,
            Self::ServerProcesses => Self::ServerResponds,
            Self::ServerResponds => Self::ClientWaits,
            Self::ClientWaits => Self::ClientSends,
        }
    }

    /// Direction of traffic during this step, `None` while nothing moves.
    pub fn traffic(self) -> Option<Direction> {
        match self {
            Self::ClientSends => Some(Direction::ToServer),
            Self::ServerResponds => Some(Direction::ToClient),
            Self::ServerProcesses | Self::ClientWaits => None,
        }
    }
}

impl fmt::Display for RequestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClientSends => "client sends request",
            Self::ServerProcesses => "server processing",
            Self::ServerResponds => "server responds",
            Self::ClientWaits => "client waiting",
        })
    }
}

/// Stepper for the request/response cycle.
#[derive(Debug, Clone, Default)]
pub struct RequestCycle {
    step: RequestStep,
    completed: u64,
}

impl RequestCycle {
    /// Start at [`RequestStep::ClientSends`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    pub fn step(&self) -> RequestStep {
        self.step
    }

    /// Full exchanges finished so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Move to the next step and return it.
    pub fn advance(&mut self) -> RequestStep {
        self.step = self.step.next();
        if self.step == RequestStep::ClientSends {
            self.completed += 1;
        }

        tracing::trace!(step = %self.step, completed = self.completed, "request cycle");
        self.step
    }
}

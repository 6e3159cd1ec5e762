//! Core of the connection-state simulator.
//!
//! Pure state machines for a simulated persistent connection and the
//! synthetic traffic it carries. Nothing in this crate performs I/O or reads
//! the system clock: time and randomness come from an [`env::Environment`],
//! and delayed work is expressed through the [`scheduler::Scheduler`] trait so
//! the same code runs against tokio timers in production and a virtual clock
//! in tests.
//!
//! # Components
//!
//! - [`ConnectionStateMachine`]: lifecycle state, commands and the timed
//!   error-recovery sequence
//! - [`EventStreamGenerator`]: bounded feed of synthetic records, emitted
//!   only while connected and unpaused
//! - [`PollingSimulator`]: request stream for the polling / long polling /
//!   persistent connection comparison
//! - [`RequestCycle`]: four-step request/response exchange shown alongside
//!   the comparison
//! - [`EventBuffer`]: fixed-capacity, oldest-evicted-first store

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod buffer;
pub mod connection;
pub mod cycle;
pub mod env;
pub mod error;
pub mod event;
pub mod polling;
pub mod scheduler;
pub mod stream;

pub use buffer::EventBuffer;
pub use connection::{
    Command, ConnectionAction, ConnectionConfig, ConnectionState, ConnectionStateMachine,
    ConnectionStatus, RecoveryPhase,
};
pub use cycle::{RequestCycle, RequestStep};
pub use env::{EnvRng, Environment};
pub use error::{ConfigError, ConnectionError, ParseCommandError};
pub use event::{ContentPool, Direction, EventKind, EventRecord};
pub use polling::{PollingMode, PollingSimulator, RequestRecord};
pub use scheduler::{Scheduler, TimerId};
pub use stream::{EventStreamGenerator, FeedOrder, StreamConfig};

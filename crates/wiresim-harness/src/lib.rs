//! Deterministic simulation harness for wiresim.
//!
//! Virtual-time implementations of the Environment and Scheduler traits, so
//! recovery timing and stream cadence can be tested to the millisecond
//! without waiting on a real clock.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the connection
//! lifecycle. Operations are applied to both the model and a [`SimWorld`],
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies WHAT must be true across all execution
//! paths, not specific scenarios. Use [`InvariantRegistry::standard()`] for
//! the full set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_driver;
pub mod sim_env;
pub mod virtual_scheduler;
pub mod world;

pub use invariants::{
    BufferWithinCapacity, Invariant, InvariantRegistry, InvariantResult, PollingCounters,
    RecordOrdering, RecoveryOnlyWhileDown, StreamSnapshot, SystemSnapshot, TickersFollowConnection,
    Violation,
};
pub use model::{
    ModelPollingMode, ModelSession, ObservableState, Operation, OperationError, OperationResult,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use virtual_scheduler::VirtualScheduler;
pub use world::{SimSimulator, SimWorld, TimelineEntry};

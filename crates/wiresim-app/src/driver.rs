//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the simulator runtime from where input comes
//! from and where output goes. Each front-end implements the trait, while the
//! generic [`crate::Runtime`] owns the session and applies inputs in order.

use std::{future::Future, ops::Sub, time::Duration};

use wiresim_core::ConnectionError;

use crate::{Input, SimulatorSnapshot};

/// Abstracts I/O operations for the simulator runtime.
///
/// # Implementations
///
/// - **Terminal**: reads commands from stdin, receives timers from tokio
/// - **Simulation**: replays a script against a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next input.
    ///
    /// Returns `None` once the input source is exhausted; the runtime then
    /// stops.
    fn poll_input(&mut self) -> impl Future<Output = Result<Option<Input>, Self::Error>> + Send;

    /// Render the current simulator state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, snapshot: &SimulatorSnapshot<Self::Instant>) -> Result<(), Self::Error>;

    /// Tell the user a command was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn report(&mut self, error: &ConnectionError) -> Result<(), Self::Error>;

    /// Release resources before the runtime returns.
    fn stop(&mut self);
}

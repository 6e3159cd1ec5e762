//! Reference model for model-based testing.
//!
//! The same [`Operation`] sequence is applied to a [`ModelSession`] and to a
//! real simulator on a virtual clock; their [`ObservableState`]s must match
//! after every step.

mod operation;
mod session;

pub use operation::{ModelPollingMode, Operation, OperationError, OperationResult};
pub use session::{ModelSession, ObservableState};

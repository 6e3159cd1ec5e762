//! Application layer for wiresim
//!
//! The simulator session and a generic runtime, so the same orchestration
//! runs against a terminal in production and a virtual clock in tests.
//!
//! # Components
//!
//! - [`Simulator`]: session object owning connection, streams and polling
//! - [`Listeners`]: status change subscriptions
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod input;
mod listener;
mod runtime;
mod simulator;
mod state;

pub use driver::Driver;
pub use input::Input;
pub use listener::{Listener, Listeners, Subscription};
pub use runtime::Runtime;
pub use simulator::{SimTask, Simulator, SimulatorConfig};
pub use state::{PollingSnapshot, SimulatorSnapshot, StreamKind};

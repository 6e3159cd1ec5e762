//! Terminal front-end for wiresim
//!
//! A thin shell over [`wiresim_app::Driver`] that provides terminal-specific
//! I/O and real timers. All orchestration logic lives in the generic
//! [`wiresim_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod system_env;
pub mod terminal;
pub mod tokio_scheduler;

pub use args::Args;
pub use system_env::SystemEnv;
pub use terminal::{TerminalDriver, TerminalError};
pub use tokio_scheduler::{Firing, TokioScheduler};
pub use wiresim_app::{Driver, Runtime, SimTask, Simulator};

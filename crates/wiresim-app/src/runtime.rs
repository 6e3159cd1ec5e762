//! Generic runtime for simulator orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Simulator`]: session state
//! - [`Driver`]: platform-specific I/O

use wiresim_core::{Environment, Scheduler};

use crate::{Driver, Input, SimTask, Simulator};

/// Generic runtime that feeds driver input into a [`Simulator`].
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `S`: Scheduler whose firings the driver delivers
/// - `E`: Environment for time and randomness
pub struct Runtime<D, S, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    simulator: Simulator<S, E>,
}

impl<D, S, E> Runtime<D, S, E>
where
    D: Driver<Instant = E::Instant>,
    S: Scheduler<SimTask>,
    E: Environment,
{
    /// Create a runtime around an existing session.
    pub fn new(driver: D, simulator: Simulator<S, E>) -> Self {
        Self { driver, simulator }
    }

    /// Run the main event loop until the driver runs dry or a quit arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.render()?;

        loop {
            let should_quit = self.process_cycle().await?;
            if should_quit {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Process one input.
    ///
    /// Returns `true` if the runtime should stop.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let Some(input) = self.driver.poll_input().await? else {
            tracing::debug!("input exhausted");
            return Ok(true);
        };

        self.apply(input)
    }

    /// Apply one input to the session.
    ///
    /// Returns `true` if the runtime should stop.
    fn apply(&mut self, input: Input) -> Result<bool, D::Error> {
        let changed = match input {
            Input::Command(command) => match self.simulator.issue(command) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(%command, %err, "command rejected");
                    self.driver.report(&err)?;
                    false
                },
            },
            Input::SetPollingMode(mode) => {
                self.simulator.set_polling_mode(mode);
                true
            },
            Input::Timer { id, task } => self.simulator.fire(id, task),
            Input::Refresh => true,
            Input::Quit => return Ok(true),
        };

        if changed {
            self.render()?;
        }
        Ok(false)
    }

    fn render(&mut self) -> Result<(), D::Error> {
        let snapshot = self.simulator.snapshot();
        self.driver.render(&snapshot)
    }

    /// Get a reference to the session
    pub fn simulator(&self) -> &Simulator<S, E> {
        &self.simulator
    }

    /// Get a mutable reference to the session
    pub fn simulator_mut(&mut self) -> &mut Simulator<S, E> {
        &mut self.simulator
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

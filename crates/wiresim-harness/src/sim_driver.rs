//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`wiresim_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Input comes from a script of `(instant, input)` pairs merged with the
//! timers of a [`VirtualScheduler`]. Whichever is due first is delivered,
//! timers first on a tie, and the virtual clock jumps to its instant. Nothing
//! past the horizon is delivered.

use std::collections::BTreeMap;

use wiresim_app::{Driver, Input, SimTask, SimulatorSnapshot};
use wiresim_core::{ConnectionError, Environment};

use crate::{InvariantRegistry, SimEnv, SimInstant, SystemSnapshot, Violation, VirtualScheduler};

/// Error type for simulation driver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimDriverError {
    /// A rendered snapshot broke an invariant.
    #[error("invariant violated at {at}: {violations:?}")]
    Invariant {
        /// Virtual instant of the render
        at: SimInstant,
        /// Every violation found
        violations: Vec<Violation>,
    },
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    env: SimEnv,
    scheduler: VirtualScheduler<SimTask>,
    horizon: SimInstant,
    script: BTreeMap<(SimInstant, u64), Input>,
    next_seq: u64,
    renders: Vec<(SimInstant, SimulatorSnapshot<SimInstant>)>,
    reports: Vec<(SimInstant, ConnectionError)>,
    invariants: Option<InvariantRegistry>,
    stopped: bool,
}

impl SimDriver {
    /// Create a driver that delivers timers from `scheduler` up to `horizon`.
    pub fn new(env: SimEnv, scheduler: VirtualScheduler<SimTask>, horizon: SimInstant) -> Self {
        Self {
            env,
            scheduler,
            horizon,
            script: BTreeMap::new(),
            next_seq: 0,
            renders: Vec::new(),
            reports: Vec::new(),
            invariants: None,
            stopped: false,
        }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Schedule `input` for delivery at `at`.
    ///
    /// Inputs scheduled for the same instant are delivered in the order they
    /// were added.
    pub fn inject_at(&mut self, at: SimInstant, input: Input) {
        self.script.insert((at, self.next_seq), input);
        self.next_seq += 1;
    }

    /// Schedule `input` `millis` after the start of the run.
    #[must_use]
    pub fn with_input(mut self, millis: u64, input: Input) -> Self {
        self.inject_at(SimInstant::from_millis(millis), input);
        self
    }

    /// Check if anything is left to deliver before the horizon.
    pub fn has_pending(&self) -> bool {
        self.next_due().is_some()
    }

    /// Every rendered snapshot with the instant it was rendered.
    pub fn renders(&self) -> &[(SimInstant, SimulatorSnapshot<SimInstant>)] {
        &self.renders
    }

    /// Most recent render.
    pub fn last_render(&self) -> Option<&SimulatorSnapshot<SimInstant>> {
        self.renders.last().map(|(_, snapshot)| snapshot)
    }

    /// Every rejected command with the instant it was rejected.
    pub fn reports(&self) -> &[(SimInstant, ConnectionError)] {
        &self.reports
    }

    /// True once the runtime has stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn next_due(&self) -> Option<(SimInstant, bool)> {
        let timer = self.scheduler.next_deadline().filter(|at| *at <= self.horizon);
        let input = self.script.keys().next().map(|(at, _)| *at).filter(|at| *at <= self.horizon);

        match (timer, input) {
            (Some(t), None) => Some((t, true)),
            (Some(t), Some(i)) if t <= i => Some((t, true)),
            (_, Some(i)) => Some((i, false)),
            (None, None) => None,
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_input(&mut self) -> Result<Option<Input>, Self::Error> {
        let Some((at, is_timer)) = self.next_due() else {
            self.env.advance_to(self.horizon);
            return Ok(None);
        };

        let input = if is_timer {
            self.scheduler.pop_due(at).map(|(_, id, task)| Input::Timer { id, task })
        } else {
            self.script.pop_first().map(|(_, input)| input)
        };

        self.env.advance_to(at);
        Ok(input)
    }

    fn render(&mut self, snapshot: &SimulatorSnapshot<SimInstant>) -> Result<(), Self::Error> {
        let at = self.env.now();

        if let Some(registry) = &self.invariants
            && let Err(violations) = registry.check_all(&SystemSnapshot::from_view(snapshot))
        {
            return Err(SimDriverError::Invariant { at, violations });
        }

        self.renders.push((at, snapshot.clone()));
        Ok(())
    }

    fn report(&mut self, error: &ConnectionError) -> Result<(), Self::Error> {
        self.reports.push((self.env.now(), *error));
        Ok(())
    }

    fn stop(&mut self) {
        tracing::debug!(now = %self.env.now(), renders = self.renders.len(), "sim driver stopped");
        self.stopped = true;
    }
}

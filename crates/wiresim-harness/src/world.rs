//! Simulation world - a simulator on a virtual clock.
//!
//! [`SimWorld`] wires a [`Simulator`] to a [`VirtualScheduler`] and a
//! [`SimEnv`], then lets tests move time forward explicitly. Every committed
//! status change is recorded with the virtual instant it happened at.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use wiresim_app::{SimTask, Simulator, SimulatorConfig, Subscription};
use wiresim_core::{Command, ConfigError, ConnectionError, ConnectionStatus, Environment};

use crate::{
    ObservableState, Operation, OperationResult, SimEnv, SimInstant, SystemSnapshot,
    VirtualScheduler,
};

/// Simulator type used throughout the harness.
pub type SimSimulator = Simulator<VirtualScheduler<SimTask>, SimEnv>;

/// One entry of the status timeline.
pub type TimelineEntry = (SimInstant, ConnectionStatus);

/// Deterministic simulator with manual time control.
pub struct SimWorld {
    env: SimEnv,
    scheduler: VirtualScheduler<SimTask>,
    simulator: SimSimulator,
    timeline: Arc<Mutex<Vec<TimelineEntry>>>,
    /// Handle of the listener feeding `timeline`; it stays registered until
    /// the world and its simulator are dropped together.
    _recorder: Subscription,
    fired: u64,
}

impl SimWorld {
    /// Default configuration with RNG seeded from `seed`.
    pub fn new(seed: u64) -> Result<Self, ConfigError> {
        Self::with_config(SimulatorConfig::default(), seed)
    }

    /// Custom configuration with RNG seeded from `seed`.
    pub fn with_config(config: SimulatorConfig, seed: u64) -> Result<Self, ConfigError> {
        let env = SimEnv::with_seed(seed);
        let scheduler = VirtualScheduler::new(env.clone());
        let mut simulator = Simulator::new(config, scheduler.clone(), env.clone())?;

        let timeline = Arc::new(Mutex::new(vec![(env.now(), simulator.current_state())]));
        let sink = Arc::clone(&timeline);
        let clock = env.clone();
        let recorder = simulator.subscribe(move |status| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push((clock.now(), status));
        });

        Ok(Self { env, scheduler, simulator, timeline, _recorder: recorder, fired: 0 })
    }

    /// Apply a user command at the current instant.
    pub fn issue(&mut self, command: Command) -> Result<(), ConnectionError> {
        self.simulator.issue(command)
    }

    /// Apply a model operation to the real simulator.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::AdvanceTime { millis } => {
                self.advance(Duration::from_millis(u64::from(millis)));
            },
            Operation::SetPollingMode(mode) => self.simulator.set_polling_mode(mode.into()),
            Operation::Connect
            | Operation::Disconnect
            | Operation::TogglePause
            | Operation::SimulateError => {
                if let Some(command) = op.command() {
                    self.issue(command)?;
                }
            },
        }
        Ok(())
    }

    /// Observable state for oracle comparison.
    pub fn observable(&self) -> ObservableState {
        ObservableState {
            status: self.status(),
            polling_mode: self.simulator.polling_mode(),
            recovering: self.simulator.pending_recovery_timers() > 0,
        }
    }

    /// Deliver every timer due within `duration`, then leave the clock at
    /// `now + duration`.
    pub fn advance(&mut self, duration: Duration) {
        let target = self.env.now() + duration;
        self.advance_to(target);
    }

    /// Deliver every timer due at or before `target`, in deadline order,
    /// then leave the clock at `target`.
    pub fn advance_to(&mut self, target: SimInstant) {
        while let Some((deadline, id, task)) = self.scheduler.pop_due(target) {
            self.env.advance_to(deadline);
            self.simulator.fire(id, task);
            self.fired += 1;
        }
        self.env.advance_to(target);
    }

    /// Current virtual instant.
    pub fn now(&self) -> SimInstant {
        self.env.now()
    }

    /// Current `(state, paused)`.
    pub fn status(&self) -> ConnectionStatus {
        self.simulator.current_state()
    }

    /// Every committed status with the instant it was committed, starting
    /// with the initial status at time zero.
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Timer deliveries so far, stale ones included.
    pub fn timers_fired(&self) -> u64 {
        self.fired
    }

    /// Observable state for invariant checks.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::capture(&self.simulator)
    }

    /// The simulator under test.
    pub fn simulator(&self) -> &SimSimulator {
        &self.simulator
    }

    /// Mutable access to the simulator under test.
    pub fn simulator_mut(&mut self) -> &mut SimSimulator {
        &mut self.simulator
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Shared scheduler handle.
    pub fn scheduler(&self) -> &VirtualScheduler<SimTask> {
        &self.scheduler
    }
}

//! Simulator session.
//!
//! This module defines [`Simulator`], the explicitly owned session object that
//! ties the connection state machine, the two event streams, and the polling
//! comparison to a [`Scheduler`].
//!
//! The simulator is the only writer of session state. Commands arrive through
//! [`Simulator::issue`]; timer firings come back through [`Simulator::fire`].
//! Both take `&mut self`, so every unit of work is applied atomically.
//!
//! # Responsibilities
//!
//! - Executes [`ConnectionAction`]s: arms and cancels recovery timers, then
//!   notifies subscribers.
//! - Runs the stream tickers only while `Connected`, restarting them on
//!   re-entry without clearing buffered records.
//! - Runs the polling ticker at the cadence of the selected mode.
//! - Steps the request/response cycle shown next to the polling comparison.

use wiresim_core::{
    Command, ConfigError, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionState,
    ConnectionStateMachine, ConnectionStatus, ContentPool, Environment, EventRecord,
    EventStreamGenerator, PollingMode, PollingSimulator, RecoveryPhase, RequestCycle,
    RequestRecord, RequestStep, Scheduler, StreamConfig, TimerId, cycle::REQUEST_STEP_CADENCE,
    polling::REQUEST_HISTORY,
};

use crate::{
    PollingSnapshot, SimulatorSnapshot, StreamKind,
    listener::{Listeners, Subscription},
};

/// Work item carried by the simulator's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimTask {
    /// Apply one phase of a simulated-error recovery
    Recovery {
        /// Phase to apply
        phase: RecoveryPhase,
        /// Sequence the phase belongs to
        epoch: u64,
    },
    /// Emission tick for a stream
    Emit(StreamKind),
    /// Polling comparison tick
    Poll,
    /// Request/response cycle step
    Cycle,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Recovery delays
    pub connection: ConnectionConfig,
    /// Packet-level stream
    pub packets: StreamConfig,
    /// Feed-level stream
    pub feed: StreamConfig,
    /// Initial polling technique
    pub polling_mode: PollingMode,
    /// Payload and actor pools shared by both streams
    pub content: ContentPool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            packets: StreamConfig::packets(),
            feed: StreamConfig::feed(),
            polling_mode: PollingMode::default(),
            content: ContentPool::default(),
        }
    }
}

impl SimulatorConfig {
    /// Reject settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()?;
        self.packets.validate()?;
        self.feed.validate()?;
        self.content.validate()
    }
}

/// Connection-state simulator session.
///
/// # Type Parameters
///
/// - `S`: timer service delivering [`SimTask`]s
/// - `E`: environment providing time and randomness
pub struct Simulator<S, E>
where
    E: Environment,
{
    env: E,
    scheduler: S,
    machine: ConnectionStateMachine,
    packets: EventStreamGenerator<E::Instant>,
    feed: EventStreamGenerator<E::Instant>,
    polling: PollingSimulator,
    cycle: RequestCycle,
    listeners: Listeners,
    /// Recovery timers armed and not yet fired or cancelled.
    recovery_timers: Vec<TimerId>,
    packet_ticker: Option<TimerId>,
    feed_ticker: Option<TimerId>,
    poll_ticker: Option<TimerId>,
    cycle_ticker: TimerId,
}

impl<S, E> Simulator<S, E>
where
    S: Scheduler<SimTask>,
    E: Environment,
{
    /// Start a session in `(Connected, unpaused)` with all tickers running.
    ///
    /// # Errors
    ///
    /// - `ConfigError` if the recovery delays, any stream setting or the
    ///   content pool is invalid
    pub fn new(config: SimulatorConfig, mut scheduler: S, env: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let SimulatorConfig { connection, packets, feed, polling_mode, content } = config;

        let packets = EventStreamGenerator::new(packets, content.clone())?;
        let feed = EventStreamGenerator::new(feed, content)?;
        let cycle_ticker = scheduler.schedule_repeating(REQUEST_STEP_CADENCE, SimTask::Cycle);

        let mut simulator = Self {
            env,
            scheduler,
            machine: ConnectionStateMachine::new(connection),
            packets,
            feed,
            polling: PollingSimulator::new(polling_mode),
            cycle: RequestCycle::new(),
            listeners: Listeners::new(),
            recovery_timers: Vec::new(),
            packet_ticker: None,
            feed_ticker: None,
            poll_ticker: None,
            cycle_ticker,
        };

        simulator.sync_stream_tickers();
        simulator.restart_poll_ticker();

        tracing::info!(status = %simulator.current_state(), polling = %polling_mode, "simulator started");
        Ok(simulator)
    }

    /// Apply a user command.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Precondition` for `TogglePause` outside
    ///   `Connected`. Nothing changes and no timer is touched.
    pub fn issue(&mut self, command: Command) -> Result<(), ConnectionError> {
        let actions = self.machine.handle_command(command).inspect_err(|err| {
            tracing::debug!(%command, %err, "command rejected");
        })?;

        tracing::debug!(%command, status = %self.machine.status(), "command applied");
        self.execute(actions);
        Ok(())
    }

    /// Apply a fired timer.
    ///
    /// Returns true if observable state changed. Timers the simulator no
    /// longer tracks (cancelled, or superseded by a restart) are ignored.
    pub fn fire(&mut self, id: TimerId, task: SimTask) -> bool {
        match task {
            SimTask::Recovery { phase, epoch } => {
                let Some(index) = self.recovery_timers.iter().position(|t| *t == id) else {
                    tracing::trace!(%id, ?phase, "cancelled recovery timer ignored");
                    return false;
                };
                self.recovery_timers.remove(index);

                let actions = self.machine.handle_recovery(phase, epoch);
                self.execute(actions)
            },
            SimTask::Emit(kind) => {
                if self.ticker(kind) != Some(id) {
                    tracing::trace!(%id, ?kind, "stale stream tick ignored");
                    return false;
                }

                let status = self.machine.status();
                let stream = match kind {
                    StreamKind::Packets => &mut self.packets,
                    StreamKind::Feed => &mut self.feed,
                };
                stream.tick(status, &self.env).is_some()
            },
            SimTask::Poll => {
                if self.poll_ticker != Some(id) {
                    tracing::trace!(%id, "stale polling tick ignored");
                    return false;
                }

                self.polling.tick(&self.env);
                true
            },
            SimTask::Cycle => {
                if self.cycle_ticker != id {
                    tracing::trace!(%id, "stale cycle tick ignored");
                    return false;
                }

                self.cycle.advance();
                true
            },
        }
    }

    /// Switch the polling comparison to `mode`.
    ///
    /// Clears the request history and restarts the ticker at the new
    /// cadence.
    pub fn set_polling_mode(&mut self, mode: PollingMode) {
        self.polling.set_mode(mode);
        self.restart_poll_ticker();
    }

    /// Register a status listener.
    ///
    /// The listener runs synchronously, inside the command or timer that
    /// committed the change.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(ConnectionStatus) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Release a listener. Returns false if the handle is not registered.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    /// Current `(state, paused)`.
    pub fn current_state(&self) -> ConnectionStatus {
        self.machine.status()
    }

    /// Up to `limit` most recent records of `stream`.
    ///
    /// Packets come back in insertion order, the feed newest first.
    pub fn recent_events(&self, stream: StreamKind, limit: usize) -> Vec<EventRecord<E::Instant>> {
        match stream {
            StreamKind::Packets => self.packets.recent(limit),
            StreamKind::Feed => self.feed.recent(limit),
        }
    }

    /// Up to `limit` most recent polling requests, oldest first.
    pub fn recent_requests(&self, limit: usize) -> Vec<RequestRecord> {
        self.polling.recent(limit)
    }

    /// Active polling technique.
    pub fn polling_mode(&self) -> PollingMode {
        self.polling.mode()
    }

    /// Current step of the request/response cycle.
    pub fn request_step(&self) -> RequestStep {
        self.cycle.step()
    }

    /// Copy of everything a front-end displays.
    pub fn snapshot(&self) -> SimulatorSnapshot<E::Instant> {
        SimulatorSnapshot {
            status: self.current_state(),
            packets: self.packets.records(),
            feed: self.feed.records(),
            polling: PollingSnapshot {
                mode: self.polling.mode(),
                requests: self.polling.recent(REQUEST_HISTORY),
                total_requests: self.polling.total_requests(),
                empty_responses: self.polling.empty_responses(),
            },
            request_step: self.cycle.step(),
            exchanges: self.cycle.completed(),
        }
    }

    /// True while `stream` has a running ticker.
    pub fn is_ticking(&self, stream: StreamKind) -> bool {
        self.ticker(stream).is_some()
    }

    /// Buffered record count of `stream`.
    pub fn buffered(&self, stream: StreamKind) -> usize {
        match stream {
            StreamKind::Packets => self.packets.len(),
            StreamKind::Feed => self.feed.len(),
        }
    }

    /// Settings of `stream`.
    pub fn stream_config(&self, stream: StreamKind) -> &StreamConfig {
        match stream {
            StreamKind::Packets => self.packets.config(),
            StreamKind::Feed => self.feed.config(),
        }
    }

    /// Recovery timers currently armed.
    pub fn pending_recovery_timers(&self) -> usize {
        self.recovery_timers.len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Scheduler in use.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn ticker(&self, stream: StreamKind) -> Option<TimerId> {
        match stream {
            StreamKind::Packets => self.packet_ticker,
            StreamKind::Feed => self.feed_ticker,
        }
    }

    /// Execute state machine actions. Returns true if the status changed.
    fn execute(&mut self, actions: Vec<ConnectionAction>) -> bool {
        let mut changed = false;

        for action in actions {
            match action {
                ConnectionAction::CancelScheduled => {
                    for id in self.recovery_timers.drain(..) {
                        self.scheduler.cancel(id);
                    }
                },
                ConnectionAction::ScheduleRecovery { delay, phase, epoch } => {
                    let id = self.scheduler.schedule_once(delay, SimTask::Recovery { phase, epoch });
                    self.recovery_timers.push(id);
                },
                ConnectionAction::Notify(status) => {
                    self.sync_stream_tickers();
                    self.listeners.notify(status);
                    changed = true;
                },
            }
        }

        changed
    }

    /// Stream tickers run exactly while the connection is `Connected`.
    fn sync_stream_tickers(&mut self) {
        let connected = self.machine.state() == ConnectionState::Connected;

        for kind in StreamKind::ALL {
            let (slot, cadence) = match kind {
                StreamKind::Packets => (&mut self.packet_ticker, self.packets.config().cadence),
                StreamKind::Feed => (&mut self.feed_ticker, self.feed.config().cadence),
            };

            match (connected, *slot) {
                (true, None) => {
                    *slot = Some(self.scheduler.schedule_repeating(cadence, SimTask::Emit(kind)));
                    tracing::debug!(?kind, ?cadence, "stream ticker started");
                },
                (false, Some(id)) => {
                    self.scheduler.cancel(id);
                    *slot = None;
                    tracing::debug!(?kind, "stream ticker stopped");
                },
                _ => {},
            }
        }
    }

    fn restart_poll_ticker(&mut self) {
        if let Some(id) = self.poll_ticker.take() {
            self.scheduler.cancel(id);
        }

        let cadence = self.polling.mode().cadence();
        self.poll_ticker = Some(self.scheduler.schedule_repeating(cadence, SimTask::Poll));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use wiresim_core::ConnectionState;

    use super::*;

    /// Records scheduling calls without ever firing anything on its own.
    #[derive(Default)]
    struct ManualScheduler {
        next: u64,
        live: BTreeMap<TimerId, (Duration, SimTask, bool)>,
    }

    impl ManualScheduler {
        fn find(&self, wanted: impl Fn(&SimTask) -> bool) -> Vec<(TimerId, SimTask)> {
            self.live
                .iter()
                .filter(|(_, (_, t, _))| wanted(t))
                .map(|(id, (_, t, _))| (*id, *t))
                .collect()
        }
    }

    impl Scheduler<SimTask> for ManualScheduler {
        fn schedule_once(&mut self, delay: Duration, task: SimTask) -> TimerId {
            self.next += 1;
            let id = TimerId::from_raw(self.next);
            self.live.insert(id, (delay, task, false));
            id
        }

        fn schedule_repeating(&mut self, interval: Duration, task: SimTask) -> TimerId {
            self.next += 1;
            let id = TimerId::from_raw(self.next);
            self.live.insert(id, (interval, task, true));
            id
        }

        fn cancel(&mut self, id: TimerId) -> bool {
            self.live.remove(&id).is_some()
        }
    }

    #[derive(Clone)]
    struct CountingEnv(Arc<Mutex<u64>>);

    impl Environment for CountingEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let mut counter = self.0.lock().unwrap();
            for byte in buffer.iter_mut() {
                *counter = counter.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                *byte = (*counter >> 56) as u8;
            }
        }
    }

    fn simulator() -> Simulator<ManualScheduler, CountingEnv> {
        Simulator::new(
            SimulatorConfig::default(),
            ManualScheduler::default(),
            CountingEnv(Arc::new(Mutex::new(1))),
        )
        .unwrap()
    }

    fn emit_tickers(sim: &Simulator<ManualScheduler, CountingEnv>) -> Vec<(TimerId, SimTask)> {
        sim.scheduler().find(|t| matches!(t, SimTask::Emit(_)))
    }

    fn recovery_timers(sim: &Simulator<ManualScheduler, CountingEnv>) -> Vec<(TimerId, SimTask)> {
        sim.scheduler().find(|t| matches!(t, SimTask::Recovery { .. }))
    }

    #[test]
    fn starts_connected_with_tickers() {
        let sim = simulator();

        assert_eq!(sim.current_state().state, ConnectionState::Connected);
        assert!(sim.is_ticking(StreamKind::Packets));
        assert!(sim.is_ticking(StreamKind::Feed));
        assert_eq!(emit_tickers(&sim).len(), 2);
        assert_eq!(sim.scheduler().find(|t| *t == SimTask::Poll).len(), 1);
    }

    #[test]
    fn disconnect_stops_tickers_and_connect_restarts_them() {
        let mut sim = simulator();
        let (packet_id, _) = emit_tickers(&sim)[0];
        assert!(sim.fire(packet_id, SimTask::Emit(StreamKind::Packets)));

        sim.issue(Command::Disconnect).unwrap();
        assert!(emit_tickers(&sim).is_empty());
        assert!(!sim.fire(packet_id, SimTask::Emit(StreamKind::Packets)));

        sim.issue(Command::Connect).unwrap();
        assert_eq!(emit_tickers(&sim).len(), 2);
        // Buffer survives the reconnect
        assert_eq!(sim.buffered(StreamKind::Packets), 1);
    }

    #[test]
    fn pause_skips_emission_but_keeps_ticking() {
        let mut sim = simulator();
        sim.issue(Command::TogglePause).unwrap();

        for (id, task) in emit_tickers(&sim) {
            assert!(!sim.fire(id, task));
        }

        assert_eq!(emit_tickers(&sim).len(), 2);
        assert_eq!(sim.buffered(StreamKind::Packets), 0);
        assert_eq!(sim.buffered(StreamKind::Feed), 0);
    }

    #[test]
    fn toggle_pause_rejected_while_recovering() {
        let mut sim = simulator();
        sim.issue(Command::SimulateError).unwrap();

        let err = sim.issue(Command::TogglePause).unwrap_err();

        assert!(err.is_transient());
        assert_eq!(recovery_timers(&sim).len(), 2);
        assert_eq!(sim.pending_recovery_timers(), 2);
    }

    #[test]
    fn recovery_timers_drive_state_back_to_connected() {
        let mut sim = simulator();
        sim.issue(Command::SimulateError).unwrap();

        let timers = recovery_timers(&sim);
        for (id, task) in timers {
            assert!(sim.fire(id, task));
            sim.scheduler.cancel(id);
        }

        assert_eq!(sim.current_state().state, ConnectionState::Connected);
        assert_eq!(sim.pending_recovery_timers(), 0);
        assert_eq!(emit_tickers(&sim).len(), 2);
    }

    #[test]
    fn manual_command_cancels_recovery_timers() {
        let mut sim = simulator();
        sim.issue(Command::SimulateError).unwrap();
        let timers = recovery_timers(&sim);

        sim.issue(Command::Connect).unwrap();

        assert!(recovery_timers(&sim).is_empty());
        for (id, task) in timers {
            assert!(!sim.fire(id, task));
        }
        assert_eq!(sim.current_state().state, ConnectionState::Connected);
    }

    #[test]
    fn listeners_see_each_committed_status() {
        let mut sim = simulator();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = sim.subscribe(move |status| sink.lock().unwrap().push(status.state));

        sim.issue(Command::Disconnect).unwrap();
        sim.issue(Command::Disconnect).unwrap();
        sim.issue(Command::Connect).unwrap();
        assert!(sim.unsubscribe(sub));
        sim.issue(Command::Disconnect).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![
            ConnectionState::Disconnected,
            ConnectionState::Connected
        ]);
        assert_eq!(sim.listener_count(), 0);
    }

    #[test]
    fn polling_mode_switch_restarts_ticker() {
        let mut sim = simulator();
        let (old, _) = sim.scheduler().find(|t| *t == SimTask::Poll)[0];
        assert!(sim.fire(old, SimTask::Poll));

        sim.set_polling_mode(PollingMode::Realtime);

        let polls = sim.scheduler().find(|t| *t == SimTask::Poll);
        assert_eq!(polls.len(), 1);
        assert_ne!(polls[0].0, old);
        assert!(!sim.fire(old, SimTask::Poll));
        assert!(sim.recent_requests(REQUEST_HISTORY).is_empty());
        assert_eq!(sim.polling_mode(), PollingMode::Realtime);
    }

    #[test]
    fn request_cycle_steps_regardless_of_connection() {
        let mut sim = simulator();
        sim.issue(Command::Disconnect).unwrap();
        let (cycle, _) = sim.scheduler().find(|t| *t == SimTask::Cycle)[0];

        for _ in 0..5 {
            assert!(sim.fire(cycle, SimTask::Cycle));
        }

        assert_eq!(sim.request_step(), RequestStep::ServerProcesses);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.request_step, RequestStep::ServerProcesses);
        assert_eq!(snapshot.exchanges, 1);
        assert!(!sim.fire(TimerId::from_raw(u64::MAX), SimTask::Cycle));
    }

    #[test]
    fn overflowing_recovery_delays_are_rejected() {
        let config = SimulatorConfig {
            connection: ConnectionConfig {
                error_delay: Duration::MAX,
                recovery_delay: Duration::from_millis(1),
            },
            ..SimulatorConfig::default()
        };

        let result = Simulator::new(
            config,
            ManualScheduler::default(),
            CountingEnv(Arc::new(Mutex::new(1))),
        );

        assert!(matches!(result, Err(ConfigError::DelayOverflow { .. })));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulatorConfig {
            feed: StreamConfig { capacity: 0, ..StreamConfig::feed() },
            ..SimulatorConfig::default()
        };

        let result = Simulator::new(
            config,
            ManualScheduler::default(),
            CountingEnv(Arc::new(Mutex::new(1))),
        );

        assert!(matches!(result, Err(ConfigError::ZeroCapacity { stream: "feed" })));
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Issue(Command),
        FireTicker(usize),
        FireRecovery,
    }

    fn step_strategy() -> impl proptest::strategy::Strategy<Value = Step> {
        use proptest::prelude::*;

        prop_oneof![
            1 => Just(Step::Issue(Command::Connect)),
            1 => Just(Step::Issue(Command::Disconnect)),
            1 => Just(Step::Issue(Command::TogglePause)),
            1 => Just(Step::Issue(Command::SimulateError)),
            3 => (0usize..3).prop_map(Step::FireTicker),
            2 => Just(Step::FireRecovery),
        ]
    }

    proptest::proptest! {
        /// Timer bookkeeping follows the connection state whatever order
        /// commands and firings arrive in.
        #[test]
        fn prop_timers_follow_state(steps in proptest::collection::vec(step_strategy(), 1..60)) {
            let mut sim = simulator();

            for step in steps {
                match step {
                    Step::Issue(command) => {
                        let _ = sim.issue(command);
                    },
                    Step::FireTicker(index) => {
                        let tickers = sim.scheduler().find(|t| !matches!(t, SimTask::Recovery { .. }));
                        if let Some(&(id, task)) = tickers.get(index) {
                            sim.fire(id, task);
                        }
                    },
                    Step::FireRecovery => {
                        // Earliest scheduled phase first, as a real clock would
                        if let Some(&(id, task)) = recovery_timers(&sim).first() {
                            sim.scheduler.cancel(id);
                            sim.fire(id, task);
                        }
                    },
                }

                let connected = sim.current_state().state == ConnectionState::Connected;
                proptest::prop_assert_eq!(emit_tickers(&sim).len(), if connected { 2 } else { 0 });
                proptest::prop_assert_eq!(sim.pending_recovery_timers(), recovery_timers(&sim).len());
                proptest::prop_assert!(sim.pending_recovery_timers() <= 2);
                if connected {
                    proptest::prop_assert_eq!(sim.pending_recovery_timers(), 0);
                }
                for kind in [StreamKind::Packets, StreamKind::Feed] {
                    proptest::prop_assert!(sim.buffered(kind) <= sim.stream_config(kind).capacity);
                }
            }
        }
    }
}

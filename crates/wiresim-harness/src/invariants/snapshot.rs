//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the simulator at a point in
//! time. Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use wiresim_app::{SimTask, Simulator, SimulatorSnapshot, StreamKind};
use wiresim_core::{ConnectionStatus, Environment, EventRecord, FeedOrder, Scheduler};

/// Snapshot of the whole simulator.
///
/// Fields the source cannot see are `None` and the checks that need them
/// are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Connection `(state, paused)`.
    pub status: ConnectionStatus,
    /// Packet-level stream.
    pub packets: StreamSnapshot,
    /// Feed-level stream.
    pub feed: StreamSnapshot,
    /// Request ids shown by the polling comparison, oldest first.
    pub request_ids: Vec<u64>,
    /// Requests issued since the polling mode was selected.
    pub total_requests: u64,
    /// Requests that came back empty.
    pub empty_responses: u64,
    /// Recovery timers armed.
    pub pending_recovery: Option<usize>,
}

/// Snapshot of one event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    /// Record ids in display order.
    pub ids: Vec<u64>,
    /// Buffer capacity.
    pub capacity: Option<usize>,
    /// Display order.
    pub order: Option<FeedOrder>,
    /// Whether the emission ticker is running.
    pub ticking: Option<bool>,
}

impl StreamSnapshot {
    fn from_records<I>(records: &[EventRecord<I>]) -> Self {
        Self { ids: records.iter().map(|r| r.id).collect(), ..Self::default() }
    }
}

impl SystemSnapshot {
    /// Capture everything the simulator exposes.
    pub fn capture<S, E>(simulator: &Simulator<S, E>) -> Self
    where
        S: Scheduler<SimTask>,
        E: Environment,
    {
        let mut snapshot = Self::from_view(&simulator.snapshot());
        snapshot.pending_recovery = Some(simulator.pending_recovery_timers());

        for kind in StreamKind::ALL {
            let config = simulator.stream_config(kind);
            let stream = match kind {
                StreamKind::Packets => &mut snapshot.packets,
                StreamKind::Feed => &mut snapshot.feed,
            };
            stream.capacity = Some(config.capacity);
            stream.order = Some(config.order);
            stream.ticking = Some(simulator.is_ticking(kind));
        }

        snapshot
    }

    /// Build from what a driver is given to render.
    pub fn from_view<I>(view: &SimulatorSnapshot<I>) -> Self {
        Self {
            status: view.status,
            packets: StreamSnapshot::from_records(&view.packets),
            feed: StreamSnapshot::from_records(&view.feed),
            request_ids: view.polling.requests.iter().map(|r| r.id).collect(),
            total_requests: view.polling.total_requests,
            empty_responses: view.polling.empty_responses,
            pending_recovery: None,
        }
    }
}

//! Observable simulator state types.
//!
//! These structures are the "view model" handed to drivers for rendering. They
//! are plain copies: holding a snapshot never blocks the simulator.

use wiresim_core::{ConnectionStatus, EventRecord, PollingMode, RequestRecord, RequestStep};

/// Identifies one of the simulator's two event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Packet-level stream (connection diagram)
    Packets,
    /// Feed-level stream (live data feed)
    Feed,
}

impl StreamKind {
    /// Both streams.
    pub const ALL: [Self; 2] = [Self::Packets, Self::Feed];
}

/// Point-in-time copy of everything a front-end can display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorSnapshot<I> {
    /// Connection `(state, paused)`
    pub status: ConnectionStatus,
    /// Packet stream, insertion order
    pub packets: Vec<EventRecord<I>>,
    /// Feed stream, newest first
    pub feed: Vec<EventRecord<I>>,
    /// Polling comparison
    pub polling: PollingSnapshot,
    /// Request/response cycle step
    pub request_step: RequestStep,
    /// Request/response exchanges completed
    pub exchanges: u64,
}

/// Point-in-time copy of the polling comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSnapshot {
    /// Active technique
    pub mode: PollingMode,
    /// Most recent requests, oldest first
    pub requests: Vec<RequestRecord>,
    /// Requests issued since the mode was selected
    pub total_requests: u64,
    /// Requests that came back empty
    pub empty_responses: u64,
}

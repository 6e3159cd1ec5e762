//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use wiresim_core::{ConnectionState, FeedOrder, polling::REQUEST_HISTORY};

use super::{Invariant, InvariantResult, StreamSnapshot, SystemSnapshot, Violation};

/// Buffers never hold more than their capacity.
pub struct BufferWithinCapacity;

impl Invariant for BufferWithinCapacity {
    fn name(&self) -> &'static str {
        "BufferWithinCapacity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (label, stream) in [("packets", &state.packets), ("feed", &state.feed)] {
            if let Some(capacity) = stream.capacity
                && stream.ids.len() > capacity
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{label}: {} records, capacity {capacity}", stream.ids.len()),
                });
            }
        }

        if state.request_ids.len() > REQUEST_HISTORY {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "polling: {} requests shown, history {REQUEST_HISTORY}",
                    state.request_ids.len()
                ),
            });
        }
        Ok(())
    }
}

/// Buffered records are the most recent emissions, in display order.
///
/// Ids are assigned sequentially and eviction drops the oldest, so the
/// buffer always holds a run of consecutive ids: ascending for insertion
/// order, descending for newest first.
pub struct RecordOrdering;

impl RecordOrdering {
    fn check_stream(&self, label: &str, stream: &StreamSnapshot) -> InvariantResult {
        let ascending = stream.ids.windows(2).all(|w| w[1] == w[0] + 1);
        let descending = stream.ids.windows(2).all(|w| w[0] == w[1] + 1);

        let ok = match stream.order {
            Some(FeedOrder::Insertion) => ascending,
            Some(FeedOrder::NewestFirst) => descending,
            None => ascending || descending,
        };

        if ok {
            Ok(())
        } else {
            Err(Violation {
                invariant: self.name(),
                message: format!("{label}: ids {:?} not consecutive in {:?}", stream.ids, stream.order),
            })
        }
    }
}

impl Invariant for RecordOrdering {
    fn name(&self) -> &'static str {
        "RecordOrdering"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        self.check_stream("packets", &state.packets)?;
        self.check_stream("feed", &state.feed)
    }
}

/// Emission tickers run exactly while the connection is `Connected`.
pub struct TickersFollowConnection;

impl Invariant for TickersFollowConnection {
    fn name(&self) -> &'static str {
        "TickersFollowConnection"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let connected = state.status.state == ConnectionState::Connected;

        for (label, stream) in [("packets", &state.packets), ("feed", &state.feed)] {
            if let Some(ticking) = stream.ticking
                && ticking != connected
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{label}: ticking={ticking} while {}", state.status),
                });
            }
        }
        Ok(())
    }
}

/// A recovery sequence in flight means the connection is down.
///
/// At most the two phases of one sequence are armed at a time.
pub struct RecoveryOnlyWhileDown;

impl Invariant for RecoveryOnlyWhileDown {
    fn name(&self) -> &'static str {
        "RecoveryOnlyWhileDown"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(pending) = state.pending_recovery else {
            return Ok(());
        };

        if pending > 2 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{pending} recovery timers armed"),
            });
        }

        if pending > 0 && state.status.state == ConnectionState::Connected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{pending} recovery timers armed while {}", state.status),
            });
        }
        Ok(())
    }
}

/// Polling counters agree with the request history.
pub struct PollingCounters;

impl Invariant for PollingCounters {
    fn name(&self) -> &'static str {
        "PollingCounters"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.empty_responses > state.total_requests {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} empty responses out of {} requests",
                    state.empty_responses, state.total_requests
                ),
            });
        }

        let shown = state.request_ids.len() as u64;
        let expected: Vec<u64> = (state.total_requests - shown.min(state.total_requests)
            ..state.total_requests)
            .collect();
        if state.request_ids != expected {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "request ids {:?}, expected {expected:?} after {} requests",
                    state.request_ids, state.total_requests
                ),
            });
        }
        Ok(())
    }
}

//! Timer scheduling abstraction.
//!
//! All delayed and periodic work in the simulator goes through
//! [`Scheduler`]. A scheduler does not run closures: it holds a task value
//! and hands `(TimerId, task)` back to its owner when the timer fires. The
//! owner then applies the task with exclusive access, so no two units of
//! work ever overlap.
//!
//! Production uses tokio tasks; tests use a virtual clock that fires timers
//! in `(deadline, insertion order)`.

use std::{fmt, time::Duration};

/// Handle to a scheduled timer.
///
/// Identifiers are unique per scheduler and never reused, so a stale firing
/// can always be told apart from a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw identifier. Schedulers call this; callers treat ids as
    /// opaque.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Timer service offering one-shot and repeating timers with cancellation.
///
/// # Invariants
///
/// - Timers with earlier deadlines fire first; equal deadlines fire in
///   scheduling order.
/// - After `cancel(id)` returns, the scheduler does not deliver `id` again.
///   Production schedulers may have a delivery already in flight, so owners
///   must still ignore ids they no longer track.
/// - A repeating timer first fires one `interval` after scheduling.
pub trait Scheduler<T> {
    /// Deliver `task` once, `delay` from now.
    fn schedule_once(&mut self, delay: Duration, task: T) -> TimerId;

    /// Deliver `task` every `interval` until cancelled.
    fn schedule_repeating(&mut self, interval: Duration, task: T) -> TimerId;

    /// Cancel a timer. Returns false if it already fired (one-shot) or was
    /// never scheduled.
    fn cancel(&mut self, id: TimerId) -> bool;
}

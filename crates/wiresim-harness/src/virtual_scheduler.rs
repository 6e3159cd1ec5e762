//! Virtual-clock scheduler.
//!
//! Timers live in a queue ordered by `(deadline, sequence)`, so equal
//! deadlines fire in the order they were scheduled. Nothing fires on its own:
//! the harness pulls due timers with [`VirtualScheduler::pop_due`] and moves
//! the clock to each deadline before delivering it.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use wiresim_core::{Environment, Scheduler, TimerId};

use crate::{SimEnv, SimInstant};

struct Entry<T> {
    id: TimerId,
    task: T,
    interval: Option<Duration>,
}

struct Queue<T> {
    next_id: u64,
    next_seq: u64,
    timers: BTreeMap<(SimInstant, u64), Entry<T>>,
    index: HashMap<TimerId, (SimInstant, u64)>,
}

impl<T> Queue<T> {
    fn insert(&mut self, deadline: SimInstant, entry: Entry<T>) {
        let key = (deadline, self.next_seq);
        self.next_seq += 1;
        self.index.insert(entry.id, key);
        self.timers.insert(key, entry);
    }
}

/// Scheduler driven by a [`SimEnv`] clock.
///
/// Clones share one queue: the simulator schedules through one handle while
/// the driver pops due timers through another.
pub struct VirtualScheduler<T> {
    env: SimEnv,
    queue: Arc<Mutex<Queue<T>>>,
}

impl<T> Clone for VirtualScheduler<T> {
    fn clone(&self) -> Self {
        Self { env: self.env.clone(), queue: Arc::clone(&self.queue) }
    }
}

impl<T> VirtualScheduler<T> {
    /// Create an empty scheduler reading time from `env`.
    pub fn new(env: SimEnv) -> Self {
        let queue =
            Queue { next_id: 1, next_seq: 0, timers: BTreeMap::new(), index: HashMap::new() };
        Self { env, queue: Arc::new(Mutex::new(queue)) }
    }

    fn queue(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deadline of the next timer to fire.
    pub fn next_deadline(&self) -> Option<SimInstant> {
        self.queue().timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.queue().timers.len()
    }

    /// True if no timer is scheduled.
    pub fn is_empty(&self) -> bool {
        self.queue().timers.is_empty()
    }

    fn schedule(&mut self, delay: Duration, task: T, interval: Option<Duration>) -> TimerId {
        let deadline = self.env.now() + delay;
        let mut queue = self.queue();

        let id = TimerId::from_raw(queue.next_id);
        queue.next_id += 1;
        queue.insert(deadline, Entry { id, task, interval });

        tracing::trace!(%id, %deadline, "timer scheduled");
        id
    }
}

impl<T: Clone> VirtualScheduler<T> {
    /// Remove the earliest timer due at or before `until`.
    ///
    /// Repeating timers are re-armed one interval after the deadline they
    /// fired at. The clock is not moved; the caller does that.
    pub fn pop_due(&self, until: SimInstant) -> Option<(SimInstant, TimerId, T)> {
        let mut queue = self.queue();

        let (&key, _) = queue.timers.first_key_value().filter(|((deadline, _), _)| *deadline <= until)?;
        let entry = queue.timers.remove(&key)?;
        queue.index.remove(&entry.id);

        let (deadline, _) = key;
        let fired = (deadline, entry.id, entry.task.clone());

        if let Some(interval) = entry.interval {
            queue.insert(deadline + interval, entry);
        }

        Some(fired)
    }
}

impl<T> Scheduler<T> for VirtualScheduler<T> {
    fn schedule_once(&mut self, delay: Duration, task: T) -> TimerId {
        self.schedule(delay, task, None)
    }

    fn schedule_repeating(&mut self, interval: Duration, task: T) -> TimerId {
        self.schedule(interval, task, Some(interval))
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        let mut queue = self.queue();
        let Some(key) = queue.index.remove(&id) else {
            return false;
        };

        queue.timers.remove(&key).is_some()
    }
}

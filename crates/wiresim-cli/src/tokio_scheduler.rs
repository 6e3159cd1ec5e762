//! Production scheduler on tokio tasks.
//!
//! Each timer is a spawned task that sleeps through the [`Environment`] and
//! then sends `(TimerId, task)` over an unbounded channel. The driver owns the
//! receiving end and hands firings to the runtime, so all state changes still
//! happen on the runtime's single `&mut` path. Cancelling aborts the task; a
//! firing already in the channel is ignored by the simulator.

use std::{collections::HashMap, time::Duration};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use wiresim_core::{Environment, Scheduler, TimerId};

/// Fired timer as delivered over the channel.
pub type Firing<T> = (TimerId, T);

/// Scheduler backed by tokio tasks.
///
/// Must be used from within a tokio runtime.
pub struct TokioScheduler<T, E> {
    env: E,
    tx: UnboundedSender<Firing<T>>,
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl<T, E> TokioScheduler<T, E>
where
    T: Clone + Send + 'static,
    E: Environment,
{
    /// Create a scheduler and the receiver its firings arrive on.
    pub fn new(env: E) -> (Self, UnboundedReceiver<Firing<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { env, tx, next_id: 1, tasks: HashMap::new() }, rx)
    }

    /// Number of timer tasks still running.
    pub fn active(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }

    fn spawn(&mut self, delay: Duration, task: T, repeat: bool) -> TimerId {
        // Fired one-shots are dropped here rather than on delivery
        self.tasks.retain(|_, handle| !handle.is_finished());

        let id = TimerId::from_raw(self.next_id);
        self.next_id += 1;

        let env = self.env.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            loop {
                env.sleep(delay).await;
                if tx.send((id, task.clone())).is_err() || !repeat {
                    break;
                }
            }
        });

        tracing::trace!(%id, ?delay, repeat, "timer spawned");
        self.tasks.insert(id, handle);
        id
    }
}

impl<T, E> Scheduler<T> for TokioScheduler<T, E>
where
    T: Clone + Send + 'static,
    E: Environment,
{
    fn schedule_once(&mut self, delay: Duration, task: T) -> TimerId {
        self.spawn(delay, task, false)
    }

    fn schedule_repeating(&mut self, interval: Duration, task: T) -> TimerId {
        self.spawn(interval, task, true)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        let Some(handle) = self.tasks.remove(&id) else {
            return false;
        };

        let pending = !handle.is_finished();
        handle.abort();
        pending
    }
}

impl<T, E> Drop for TokioScheduler<T, E> {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}

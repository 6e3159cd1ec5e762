//! Request stream for comparing polling techniques.
//!
//! Three ways for a client to learn about new data:
//!
//! - `Polling`: ask on a fixed period; most answers come back empty
//! - `LongPolling`: the server holds the request until it has data
//! - `Realtime`: a persistent connection pushes data as it happens
//!
//! Each tick models one request (or one pushed message for `Realtime`). The
//! simulator runs this independently of the connection lifecycle.

use std::{fmt, str::FromStr, time::Duration};

use rand::Rng;

use crate::{
    buffer::EventBuffer,
    env::{EnvRng, Environment},
    error::ParseCommandError,
};

/// Requests kept for display.
pub const REQUEST_HISTORY: usize = 7;

/// Chance that a plain poll finds new data.
pub const POLL_HIT_RATIO: f64 = 0.3;

/// Technique being demonstrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PollingMode {
    /// Fixed-period requests
    #[default]
    Polling,
    /// Requests held open until data is available
    LongPolling,
    /// Persistent bidirectional connection
    Realtime,
}

impl PollingMode {
    /// Every mode, in display order.
    pub const ALL: [Self; 3] = [Self::Polling, Self::LongPolling, Self::Realtime];

    /// Time between requests in this mode.
    pub fn cadence(self) -> Duration {
        match self {
            Self::Polling => Duration::from_millis(1000),
            Self::LongPolling => Duration::from_millis(2500),
            Self::Realtime => Duration::from_millis(800),
        }
    }

    /// Probability that a request carries data.
    pub fn hit_ratio(self) -> f64 {
        match self {
            Self::Polling => POLL_HIT_RATIO,
            Self::LongPolling | Self::Realtime => 1.0,
        }
    }
}

impl fmt::Display for PollingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Polling => "polling",
            Self::LongPolling => "long-polling",
            Self::Realtime => "realtime",
        })
    }
}

impl FromStr for PollingMode {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        match input.to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(Self::Polling),
            "long-polling" | "long" | "longpolling" => Ok(Self::LongPolling),
            "realtime" | "websocket" | "ws" => Ok(Self::Realtime),
            _ => Err(ParseCommandError { input: input.to_string() }),
        }
    }
}

/// One simulated request and whether it returned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    /// Sequential within the current mode
    pub id: u64,
    /// False for an empty poll
    pub has_data: bool,
}

/// Request stream for the active [`PollingMode`].
#[derive(Debug, Clone)]
pub struct PollingSimulator {
    mode: PollingMode,
    history: EventBuffer<RequestRecord>,
    next_id: u64,
    empty_responses: u64,
}

impl Default for PollingSimulator {
    fn default() -> Self {
        Self::new(PollingMode::default())
    }
}

impl PollingSimulator {
    /// Start an empty stream in `mode`.
    pub fn new(mode: PollingMode) -> Self {
        Self { mode, history: EventBuffer::new(REQUEST_HISTORY), next_id: 0, empty_responses: 0 }
    }

    /// Active mode.
    pub fn mode(&self) -> PollingMode {
        self.mode
    }

    /// Switch technique. Clears history and counters.
    pub fn set_mode(&mut self, mode: PollingMode) {
        tracing::debug!(from = %self.mode, to = %mode, "polling mode changed");
        *self = Self::new(mode);
    }

    /// Issue one request.
    pub fn tick<E: Environment>(&mut self, env: &E) -> RequestRecord {
        let has_data = EnvRng::new(env).gen_bool(self.mode.hit_ratio());
        let record = RequestRecord { id: self.next_id, has_data };

        self.next_id += 1;
        if !has_data {
            self.empty_responses += 1;
        }

        tracing::trace!(mode = %self.mode, id = record.id, has_data, "request");
        self.history.push(record);
        record
    }

    /// Up to `limit` most recent requests, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<RequestRecord> {
        self.history.latest(limit).copied().collect()
    }

    /// Requests issued since the last mode switch.
    pub fn total_requests(&self) -> u64 {
        self.next_id
    }

    /// Requests that came back empty since the last mode switch.
    pub fn empty_responses(&self) -> u64 {
        self.empty_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::testing::TestEnv;

    #[test]
    fn history_is_bounded() {
        let env = TestEnv::seeded(1);
        let mut sim = PollingSimulator::new(PollingMode::Realtime);

        for _ in 0..10 {
            sim.tick(&env);
        }

        let ids: Vec<u64> = sim.recent(REQUEST_HISTORY).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(sim.total_requests(), 10);
    }

    #[test]
    fn push_modes_never_come_back_empty() {
        let env = TestEnv::seeded(2);

        for mode in [PollingMode::LongPolling, PollingMode::Realtime] {
            let mut sim = PollingSimulator::new(mode);
            for _ in 0..50 {
                assert!(sim.tick(&env).has_data);
            }
            assert_eq!(sim.empty_responses(), 0);
        }
    }

    #[test]
    fn plain_polling_wastes_requests() {
        let env = TestEnv::seeded(3);
        let mut sim = PollingSimulator::new(PollingMode::Polling);

        for _ in 0..200 {
            sim.tick(&env);
        }

        // Expected ~140 empty answers out of 200
        assert!(sim.empty_responses() > 100, "empty = {}", sim.empty_responses());
        assert!(sim.empty_responses() < 180, "empty = {}", sim.empty_responses());
    }

    #[test]
    fn mode_switch_resets_stream() {
        let env = TestEnv::seeded(4);
        let mut sim = PollingSimulator::default();
        for _ in 0..5 {
            sim.tick(&env);
        }

        sim.set_mode(PollingMode::LongPolling);

        assert_eq!(sim.mode(), PollingMode::LongPolling);
        assert!(sim.recent(REQUEST_HISTORY).is_empty());
        assert_eq!(sim.total_requests(), 0);
        assert_eq!(sim.tick(&env).id, 0);
    }

    #[test]
    fn cadences_match_techniques() {
        assert_eq!(PollingMode::Polling.cadence(), Duration::from_millis(1000));
        assert_eq!(PollingMode::LongPolling.cadence(), Duration::from_millis(2500));
        assert_eq!(PollingMode::Realtime.cadence(), Duration::from_millis(800));
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("long".parse(), Ok(PollingMode::LongPolling));
        assert_eq!("WebSocket".parse(), Ok(PollingMode::Realtime));
        for mode in PollingMode::ALL {
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
        assert!("carrier-pigeon".parse::<PollingMode>().is_err());
    }
}

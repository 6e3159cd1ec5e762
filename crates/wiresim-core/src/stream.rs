//! Synthetic event stream generator.
//!
//! On every emission tick the generator reads the connection status and,
//! only if the connection is up and unpaused, appends one [`EventRecord`] to
//! its bounded buffer. Ticks in any other status are silently skipped.
//!
//! The generator does not own a timer. Whoever drives it decides when ticks
//! happen; the simulator stops ticking entirely outside `Connected`.

use std::time::Duration;

use rand::{Rng, seq::SliceRandom};

use crate::{
    buffer::EventBuffer,
    connection::ConnectionStatus,
    env::{EnvRng, Environment},
    error::ConfigError,
    event::{ContentPool, Direction, EventKind, EventRecord},
};

/// Tick period of the packet-level stream.
pub const DEFAULT_PACKET_CADENCE: Duration = Duration::from_millis(800);

/// Records kept by the packet-level stream.
pub const DEFAULT_PACKET_CAPACITY: usize = 6;

/// Tick period of the feed-level stream.
pub const DEFAULT_FEED_CADENCE: Duration = Duration::from_millis(2000);

/// Records kept by the feed-level stream.
pub const DEFAULT_FEED_CAPACITY: usize = 8;

/// Share of records sent by the server, mimicking a push-heavy channel.
pub const DEFAULT_TO_CLIENT_RATIO: f64 = 0.7;

/// Order in which [`EventStreamGenerator::recent`] returns records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    /// Oldest first, as inserted
    Insertion,
    /// Newest first
    NewestFirst,
}

/// Stream configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Name used in logs and config errors
    pub name: &'static str,
    /// Tick period
    pub cadence: Duration,
    /// Records kept before the oldest is evicted
    pub capacity: usize,
    /// Probability that a record is `ToClient`
    pub to_client_ratio: f64,
    /// Whether records carry an `origin_user`
    pub attribute_users: bool,
    /// Order of [`EventStreamGenerator::recent`]
    pub order: FeedOrder,
}

impl StreamConfig {
    /// Packet-level stream: fast, short, no actors, insertion order.
    pub fn packets() -> Self {
        Self {
            name: "packets",
            cadence: DEFAULT_PACKET_CADENCE,
            capacity: DEFAULT_PACKET_CAPACITY,
            to_client_ratio: DEFAULT_TO_CLIENT_RATIO,
            attribute_users: false,
            order: FeedOrder::Insertion,
        }
    }

    /// Feed-level stream: slower, longer, with actors, newest first.
    pub fn feed() -> Self {
        Self {
            name: "feed",
            cadence: DEFAULT_FEED_CADENCE,
            capacity: DEFAULT_FEED_CAPACITY,
            to_client_ratio: DEFAULT_TO_CLIENT_RATIO,
            attribute_users: true,
            order: FeedOrder::NewestFirst,
        }
    }

    /// Reject settings the generator or its ticker cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity { stream: self.name });
        }
        if self.cadence.is_zero() {
            return Err(ConfigError::ZeroCadence { stream: self.name, cadence: self.cadence });
        }
        if !(0.0..=1.0).contains(&self.to_client_ratio) {
            return Err(ConfigError::InvalidRatio {
                stream: self.name,
                ratio: self.to_client_ratio,
            });
        }
        Ok(())
    }
}

/// Bounded generator of synthetic records.
#[derive(Debug, Clone)]
pub struct EventStreamGenerator<I> {
    config: StreamConfig,
    pool: ContentPool,
    buffer: EventBuffer<EventRecord<I>>,
    /// Id of the next record; never reused.
    next_id: u64,
}

impl<I: Copy> EventStreamGenerator<I> {
    /// Create an empty generator.
    ///
    /// # Errors
    ///
    /// - `ConfigError` if the stream settings or content pool are invalid
    pub fn new(config: StreamConfig, pool: ContentPool) -> Result<Self, ConfigError> {
        config.validate()?;
        pool.validate()?;

        let buffer = EventBuffer::new(config.capacity);
        Ok(Self { config, pool, buffer, next_id: 0 })
    }

    /// Evaluate one emission tick.
    ///
    /// Returns the new record, or `None` if the status does not allow
    /// emission.
    pub fn tick<E>(&mut self, status: ConnectionStatus, env: &E) -> Option<&EventRecord<I>>
    where
        E: Environment<Instant = I>,
    {
        if !status.is_streaming() {
            tracing::trace!(stream = self.config.name, %status, "tick skipped");
            return None;
        }

        let record = self.generate(env);
        tracing::trace!(stream = self.config.name, id = record.id, kind = %record.kind, "emitted");

        self.buffer.push(record);
        self.buffer.newest()
    }

    fn generate<E>(&mut self, env: &E) -> EventRecord<I>
    where
        E: Environment<Instant = I>,
    {
        let mut rng = EnvRng::new(env);

        let id = self.next_id;
        self.next_id += 1;

        let kind = EventKind::ALL[rng.gen_range(0..EventKind::ALL.len())];
        let direction = if rng.gen_bool(self.config.to_client_ratio) {
            Direction::ToClient
        } else {
            Direction::ToServer
        };
        let payload = self.pool.payloads.choose(&mut rng).cloned().unwrap_or_default();
        let origin_user = if self.config.attribute_users {
            self.pool.users.choose(&mut rng).cloned()
        } else {
            None
        };

        EventRecord { id, kind, direction, payload, origin_user, timestamp: env.now() }
    }

    /// Up to `limit` of the most recent records, in the configured order.
    pub fn recent(&self, limit: usize) -> Vec<EventRecord<I>> {
        let latest = self.buffer.latest(limit).cloned();
        match self.config.order {
            FeedOrder::Insertion => latest.collect(),
            FeedOrder::NewestFirst => latest.rev().collect(),
        }
    }

    /// Every buffered record, in the configured order.
    pub fn records(&self) -> Vec<EventRecord<I>> {
        self.recent(self.buffer.capacity())
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of records emitted over the generator's lifetime.
    pub fn emitted(&self) -> u64 {
        self.next_id
    }

    /// Configuration in use.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{ConnectionState, ConnectionStatus},
        env::testing::TestEnv,
    };

    const LIVE: ConnectionStatus =
        ConnectionStatus { state: ConnectionState::Connected, paused: false };

    fn generator(config: StreamConfig) -> EventStreamGenerator<std::time::Instant> {
        EventStreamGenerator::new(config, ContentPool::default()).unwrap()
    }

    #[test]
    fn emits_only_while_streaming() {
        let env = TestEnv::seeded(3);
        let mut stream = generator(StreamConfig::packets());

        let paused = ConnectionStatus { paused: true, ..LIVE };
        let down = ConnectionStatus { state: ConnectionState::Disconnected, paused: false };
        let recovering = ConnectionStatus { state: ConnectionState::Reconnecting, paused: false };

        assert!(stream.tick(paused, &env).is_none());
        assert!(stream.tick(down, &env).is_none());
        assert!(stream.tick(recovering, &env).is_none());
        assert!(stream.is_empty());

        assert!(stream.tick(LIVE, &env).is_some());
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn ids_strictly_increase_and_survive_eviction() {
        let env = TestEnv::seeded(5);
        let mut stream = generator(StreamConfig::packets());

        for _ in 0..20 {
            stream.tick(LIVE, &env);
        }

        let ids: Vec<u64> = stream.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![14, 15, 16, 17, 18, 19]);
        assert_eq!(stream.emitted(), 20);
    }

    #[test]
    fn feed_reads_newest_first_with_users() {
        let env = TestEnv::seeded(9);
        let mut stream = generator(StreamConfig::feed());

        for _ in 0..3 {
            stream.tick(LIVE, &env);
        }

        let records = stream.recent(2);
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(records.iter().all(|r| r.origin_user.is_some()));
    }

    #[test]
    fn packets_have_no_origin_user() {
        let env = TestEnv::seeded(11);
        let mut stream = generator(StreamConfig::packets());

        let record = stream.tick(LIVE, &env).cloned().unwrap();

        assert!(record.origin_user.is_none());
        assert!(ContentPool::default().payloads.contains(&record.payload));
    }

    #[test]
    fn direction_ratio_extremes_are_honoured() {
        let env = TestEnv::seeded(13);
        let mut push_only =
            generator(StreamConfig { to_client_ratio: 1.0, ..StreamConfig::packets() });
        let mut upload_only =
            generator(StreamConfig { to_client_ratio: 0.0, ..StreamConfig::packets() });

        for _ in 0..6 {
            push_only.tick(LIVE, &env);
            upload_only.tick(LIVE, &env);
        }

        assert!(push_only.records().iter().all(|r| r.direction == Direction::ToClient));
        assert!(upload_only.records().iter().all(|r| r.direction == Direction::ToServer));
    }

    #[test]
    fn default_mix_follows_weights() {
        let env = TestEnv::seeded(21);
        let mut stream = generator(StreamConfig::packets());

        let mut to_client = 0;
        let mut kinds = [0usize; 3];
        for _ in 0..1000 {
            let record = stream.tick(LIVE, &env).unwrap();
            if record.direction == Direction::ToClient {
                to_client += 1;
            }
            kinds[EventKind::ALL.iter().position(|k| *k == record.kind).unwrap()] += 1;
        }

        // Expected ~700 pushed to the client, ~333 of each kind
        assert!((620..=780).contains(&to_client), "to_client = {to_client}");
        for count in kinds {
            assert!((250..=420).contains(&count), "kinds = {kinds:?}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let run = |seed| {
            let env = TestEnv::seeded(seed);
            let mut stream = generator(StreamConfig::feed());
            for _ in 0..8 {
                stream.tick(LIVE, &env);
            }
            stream
                .records()
                .into_iter()
                .map(|r| (r.kind, r.direction, r.payload, r.origin_user))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(21), run(21));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let pool = ContentPool::default();

        let zero = StreamConfig { capacity: 0, ..StreamConfig::feed() };
        assert_eq!(
            EventStreamGenerator::<std::time::Instant>::new(zero, pool.clone()).unwrap_err(),
            ConfigError::ZeroCapacity { stream: "feed" }
        );

        let still = StreamConfig { cadence: Duration::ZERO, ..StreamConfig::packets() };
        assert!(matches!(
            EventStreamGenerator::<std::time::Instant>::new(still, pool.clone()),
            Err(ConfigError::ZeroCadence { .. })
        ));

        let skewed = StreamConfig { to_client_ratio: 1.5, ..StreamConfig::packets() };
        assert!(matches!(
            EventStreamGenerator::<std::time::Instant>::new(skewed, pool),
            Err(ConfigError::InvalidRatio { .. })
        ));
    }
}

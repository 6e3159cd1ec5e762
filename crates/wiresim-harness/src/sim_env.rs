//! Virtual-time environment.
//!
//! [`SimEnv`] implements [`Environment`] over a shared virtual clock and a
//! seeded ChaCha RNG. Clones share both, so the simulator, the scheduler and
//! the test all observe the same time and the same random stream.
//!
//! Time only moves when the harness says so: [`SimEnv::advance_to`] is
//! called by whoever delivers timers, and `sleep` moves the clock forward
//! instead of waiting.

use std::{
    fmt,
    ops::{Add, Sub},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wiresim_core::Environment;

/// Point on the virtual clock, measured from the start of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Start of every run.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Instant `millis` after the start.
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Time since the start of the run.
    pub fn elapsed(self) -> Duration {
        self.0
    }

    /// Milliseconds since the start of the run.
    pub fn as_millis(self) -> u64 {
        self.0.as_millis() as u64
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for SimInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis())
    }
}

/// Deterministic environment for simulation.
#[derive(Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<SimInstant>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimEnv").field("now", &self.now()).finish_non_exhaustive()
    }
}

impl SimEnv {
    /// Start a run at [`SimInstant::ZERO`] with RNG seeded from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(SimInstant::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock to `instant`. Earlier instants are ignored so time
    /// never goes backwards.
    pub fn advance_to(&self, instant: SimInstant) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        if instant > *clock {
            *clock = instant;
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock = *clock + duration;
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

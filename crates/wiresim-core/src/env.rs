//! Environment abstraction for deterministic testing.
//!
//! Decouples simulation logic from system resources (time, randomness).
//! Enables deterministic runs with a virtual clock and seeded RNG, and
//! production use with the real clock and OS entropy.

use std::time::Duration;

use rand::RngCore;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment yields the same bytes
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by scheduler and driver code (not simulation logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Adapts an [`Environment`] into a [`rand::RngCore`].
///
/// Lets generators use `rand`'s uniform ranges, weighted booleans and slice
/// choice while every byte of entropy still comes from the environment.
pub struct EnvRng<'a, E>(&'a E);

impl<'a, E: Environment> EnvRng<'a, E> {
    /// Borrow `env` as a random number generator.
    pub fn new(env: &'a E) -> Self {
        Self(env)
    }
}

impl<E: Environment> RngCore for EnvRng<'_, E> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.0.random_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        self.0.random_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.random_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal environment for unit tests in this crate.

    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::Environment;

    #[derive(Clone)]
    pub struct TestEnv {
        rng: Arc<Mutex<ChaCha8Rng>>,
    }

    impl TestEnv {
        pub fn seeded(seed: u64) -> Self {
            Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
        }
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        #[allow(clippy::unwrap_used)]
        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().unwrap().fill_bytes(buffer);
        }
    }
}
